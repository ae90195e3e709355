//! Typed candidate feed
//!
//! [`CandidateFeed`] is the importer's view of the outside world: the list of
//! areas at each level and the races reported for an area. [`IebcFeed`] serves
//! it from the live API through the response cache.

use serde_json::Value;

use super::cache::ResponseCache;
use super::client::IebcClient;
use super::types::{Area, AreaList, AreaType, CandidateList, Race};
use crate::ImportResult;

/// Source of areas and candidates
#[allow(async_fn_in_trait)]
pub trait CandidateFeed {
    /// All areas of one level
    async fn areas(&self, area_type: AreaType) -> ImportResult<Vec<Area>>;

    /// Races (each a list of candidates) reported for one area
    async fn candidates(&self, area_type: AreaType, area_code: &str) -> ImportResult<Vec<Race>>;
}

/// Live IEBC feed with on-disk caching
pub struct IebcFeed {
    client: IebcClient,
    cache: ResponseCache,
}

impl IebcFeed {
    /// The client must already be authenticated unless every response is cached
    pub fn new(client: IebcClient, cache: ResponseCache) -> Self {
        Self { client, cache }
    }

    /// Cached response, or fetch all pages and cache them
    async fn get_with_cache(
        &self,
        cache_name: &str,
        path: &str,
        filter: Option<(&str, &str)>,
    ) -> ImportResult<Value> {
        if let Some(value) = self.cache.load(cache_name)? {
            return Ok(value);
        }

        let value = self.client.get_all_pages(path, filter).await?;
        self.cache.store(cache_name, &value)?;
        tracing::debug!(cache = %cache_name, "Cached IEBC response");
        Ok(value)
    }
}

impl CandidateFeed for IebcFeed {
    async fn areas(&self, area_type: AreaType) -> ImportResult<Vec<Area>> {
        let cache_name = format!("{}.json", area_type);
        let path = format!("/{}/", area_type);
        let value = self.get_with_cache(&cache_name, &path, None).await?;
        let list: AreaList = serde_json::from_value(value)?;
        Ok(list.region.locations)
    }

    async fn candidates(&self, area_type: AreaType, area_code: &str) -> ImportResult<Vec<Race>> {
        let cache_name = format!("candidates-for-{}-{}.json", area_type, area_code);
        let value = self
            .get_with_cache(
                &cache_name,
                "/candidate/",
                Some((area_type.as_str(), area_code)),
            )
            .await?;
        let list: CandidateList = serde_json::from_value(value)?;
        Ok(list.candidates)
    }
}
