//! WordPress REST publishing client.
//!
//! Thin collaborator behind the [`Publisher`] trait: resolve category names
//! to ids (creating missing categories on the fly), then create the post as
//! a draft. Posts are created with an invisible excerpt placeholder so the
//! CMS does not synthesize one from the keywords section.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::PublishError;
use crate::models::PublishedPost;
use crate::utils::slugify;

/// CMS seam consumed by the pipeline.
pub trait Publisher {
    /// Create a post and return its id and link.
    async fn publish(
        &self,
        title: &str,
        content: &str,
        categories: &[String],
    ) -> Result<PublishedPost, PublishError>;
}

#[derive(Debug, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct NewCategory<'a> {
    name: &'a str,
    slug: String,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    categories: Vec<u64>,
    excerpt: &'a str,
    format: &'a str,
}

/// WordPress REST API client with basic auth.
#[derive(Debug, Clone)]
pub struct WordPress {
    client: reqwest::Client,
    api_base: Url,
    username: String,
    password: String,
}

impl WordPress {
    pub fn new(site_url: &str, username: String, password: String) -> Result<Self, PublishError> {
        let api_base = Url::parse(&format!("{}/wp-json/wp/v2/", site_url.trim_end_matches('/')))
            .map_err(|e| PublishError::Api {
                status: 0,
                body: format!("invalid WordPress URL: {e}"),
            })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_base,
            username,
            password,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PublishError> {
        self.api_base.join(path).map_err(|e| PublishError::Api {
            status: 0,
            body: format!("invalid endpoint path: {e}"),
        })
    }

    /// Fetch all categories, following `per_page=100` pagination.
    #[instrument(level = "debug", skip_all)]
    pub async fn categories(&self) -> Result<Vec<Category>, PublishError> {
        let mut categories = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .client
                .get(self.endpoint("categories")?)
                .basic_auth(&self.username, Some(&self.password))
                .query(&[("per_page", "100"), ("page", &page.to_string())])
                .send()
                .await?;
            if !response.status().is_success() {
                // Requesting a page past the end is how pagination stops.
                break;
            }
            let batch: Vec<Category> = response.json().await?;
            if batch.is_empty() {
                break;
            }
            categories.extend(batch);
            page += 1;
        }
        Ok(categories)
    }

    async fn category_id(&self, name: &str) -> Result<Option<u64>, PublishError> {
        let categories = self.categories().await?;
        Ok(categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id))
    }

    /// Create a category and return its id.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<u64, PublishError> {
        let body = NewCategory {
            name,
            slug: slugify(name),
        };
        let response = self
            .client
            .post(self.endpoint("categories")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() != 201 {
            return Err(PublishError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        #[derive(Deserialize)]
        struct Created {
            id: u64,
        }
        let created: Created = response.json().await?;
        info!(category = %name, id = created.id, "created category");
        Ok(created.id)
    }

    /// Resolve category names to ids, creating any that do not exist.
    async fn resolve_categories(&self, names: &[String]) -> Result<Vec<u64>, PublishError> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match self.category_id(name).await? {
                Some(id) => ids.push(id),
                None => match self.create_category(name).await {
                    Ok(id) => ids.push(id),
                    Err(e) => {
                        warn!(category = %name, error = %e, "could not create category; posting without it");
                    }
                },
            }
        }
        Ok(ids)
    }
}

impl Publisher for WordPress {
    #[instrument(level = "info", skip_all, fields(title = %title))]
    async fn publish(
        &self,
        title: &str,
        content: &str,
        categories: &[String],
    ) -> Result<PublishedPost, PublishError> {
        let category_ids = self.resolve_categories(categories).await?;

        let body = NewPost {
            title,
            content,
            status: "draft",
            categories: category_ids,
            excerpt: "\u{200e}",
            format: "standard",
        };
        let response = self
            .client
            .post(self.endpoint("posts")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() != 201 {
            return Err(PublishError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let post: PublishedPost = response.json().await?;
        info!(id = post.id, link = %post.link, "post created as draft");
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_normalizes_trailing_slash() {
        let wp = WordPress::new("https://blog.example/", "user".into(), "pass".into()).unwrap();
        assert_eq!(
            wp.endpoint("posts").unwrap().as_str(),
            "https://blog.example/wp-json/wp/v2/posts"
        );
    }

    #[test]
    fn test_invalid_site_url_is_rejected() {
        assert!(WordPress::new("not a url", "u".into(), "p".into()).is_err());
    }

    #[test]
    fn test_new_post_serialization_shape() {
        let body = NewPost {
            title: "T",
            content: "<p>C</p>",
            status: "draft",
            categories: vec![3, 9],
            excerpt: "\u{200e}",
            format: "standard",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["format"], "standard");
        assert_eq!(json["categories"], serde_json::json!([3, 9]));
        assert_eq!(json["excerpt"], "\u{200e}");
    }

    #[test]
    fn test_new_category_slug() {
        let body = NewCategory {
            name: "Science & Technology",
            slug: slugify("Science & Technology"),
        };
        assert_eq!(body.slug, "science-technology");
    }
}
