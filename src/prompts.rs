//! Prompt builders for the three generation calls.
//!
//! The rewrite prompt embeds at most the first 2000 characters of the source
//! body to stay clear of token limits; truncation is char-boundary safe.

/// Maximum source characters embedded in the rewrite prompt.
const SOURCE_CHAR_CAP: usize = 2000;

/// Prompt for rewriting an article body into an original post.
pub fn rewrite_prompt(topic: &str, body: &str) -> String {
    let source = truncate_chars(body, SOURCE_CHAR_CAP);
    format!(
        "You are a professional content writer. Rewrite the following content about '{topic}' \
to make it unique, SEO-optimized, and engaging.\n\
\n\
ORIGINAL CONTENT:\n\
{source}\n\
\n\
REQUIREMENTS:\n\
- Rewrite the content completely in your own words\n\
- Keep the same main topic and key information\n\
- Write 800-1000 words in clear, professional language\n\
- Include specific examples and data where relevant\n\
- Do NOT copy any sentences from the original\n\
- Use only complete, original content; never use ellipsis or trail off\n\
\n\
STRUCTURE (follow exactly):\n\
1. Start with a main heading using ##\n\
2. Write 2-3 introduction paragraphs, without using the word 'Introduction'\n\
3. Add 3-4 descriptive section headings using ##, each with 2-3 paragraphs\n\
4. End with 1-2 conclusion paragraphs\n\
\n\
FORMATTING:\n\
- Use ## for all section headings\n\
- Plain text only; no other markdown, HTML, or special characters\n\
- Do not repeat the title\n\
- Start directly with the main heading"
    )
}

/// Prompt for rewriting a headline.
pub fn title_prompt(original_title: &str, topic: &str) -> String {
    format!(
        "Rewrite this title to make it more engaging, SEO-friendly, and professional:\n\
\n\
Original Title: {original_title}\n\
Topic: {topic}\n\
\n\
REQUIREMENTS:\n\
- Make it catchy and click-worthy\n\
- Keep it under 60 characters\n\
- Use action words; focus on the main benefit or insight\n\
- Do NOT use hashtags, asterisks, or special formatting\n\
- Do NOT copy the original title exactly\n\
\n\
Return ONLY the new title, no other text or formatting."
    )
}

/// Prompt for generating SEO keywords.
pub fn keyword_prompt(topic: &str) -> String {
    format!(
        "Generate 8-10 relevant SEO keywords for a blog post about '{topic}'.\n\
Return ONLY the keywords separated by commas, no other text or formatting.\n\
Make them specific and relevant to the topic.\n\
Include both broad and specific keywords."
    )
}

/// Take at most `cap` characters of `text` without splitting a code point.
fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
