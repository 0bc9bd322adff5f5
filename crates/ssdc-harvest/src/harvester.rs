use std::future::Future;

use crate::client::TwitterClient;
use crate::error::HarvestError;
use crate::types::Post;

/// A source of posts for one platform.
///
/// `account` is the platform-specific identifier stored as a label value in a
/// reference's `platforms` map.
pub trait Harvester {
    fn collect_user_timeline(
        &self,
        account: &str,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Post>, HarvestError>> + Send;
}

impl Harvester for TwitterClient {
    fn collect_user_timeline(
        &self,
        account: &str,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Post>, HarvestError>> + Send {
        self.user_timeline(account, limit)
    }
}
