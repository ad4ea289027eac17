use crate::client::{ClientResult, ProfileApi};
use crate::db::SocialLink;
use crate::validation::{self, SocialLinkInput, ValidationReport};

/// Ordered, locally edited copy of the user's social links. Edits stay local
/// until [`SocialLinksManager::sync`] replaces the server copy wholesale.
#[derive(Debug, Clone, Default)]
pub struct SocialLinksManager {
    links: Vec<SocialLink>,
}

impl SocialLinksManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(links: Vec<SocialLink>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[SocialLink] {
        &self.links
    }

    /// Validate and append a link with a fresh id.
    pub fn add(&mut self, platform: &str, url: &str) -> Result<&SocialLink, ValidationReport> {
        let link = validation::validate_social_link(SocialLinkInput {
            id: None,
            platform: platform.to_string(),
            url: url.to_string(),
        })?;

        self.links.push(link);
        Ok(&self.links[self.links.len() - 1])
    }

    /// Drop the link with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|link| link.id != id);
        self.links.len() != before
    }

    pub async fn load<A: ProfileApi + ?Sized>(&mut self, api: &A) -> ClientResult<()> {
        self.links = api.get_social_links().await?;
        Ok(())
    }

    pub async fn sync<A: ProfileApi + ?Sized>(&mut self, api: &A) -> ClientResult<()> {
        let inputs: Vec<SocialLinkInput> = self.links.iter().cloned().map(Into::into).collect();
        self.links = api.put_social_links(&inputs).await?;
        tracing::debug!("Synced {} social links", self.links.len());
        Ok(())
    }
}
