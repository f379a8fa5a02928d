//! Paging the Cloud catalog: one `ListResources` call per page, for a
//! single `(site_id, kind)` pair at a time.

use site_agent_core::SiteAgentResult;
use site_agent_grpc::CloudClient;
use site_agent_proto::cloud::{CloudResource, ListCloudResourcesRequest};

/// The Cloud's projection of a resource — identical shape regardless of
/// kind, by design of `cloud_catalog.proto`'s `CloudResource`.
pub type CloudEntry = CloudResource;

pub struct CloudPage {
    pub entries: Vec<CloudEntry>,
    pub next_page_token: String,
}

pub struct CloudPager {
    client: std::sync::Arc<CloudClient>,
}

impl CloudPager {
    pub fn new(client: std::sync::Arc<CloudClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, site_id: &str, kind_str: &str, page_token: String, page_size: i32) -> SiteAgentResult<CloudPage> {
        let response = self
            .client
            .call("ListResources", |mut c| {
                let request = ListCloudResourcesRequest {
                    site_id: site_id.to_string(),
                    kind: kind_str.to_string(),
                    page_token,
                    page_size,
                };
                async move { c.list_resources(request).await }
            })
            .await?;

        Ok(CloudPage {
            entries: response.resources,
            next_page_token: response.next_page_token,
        })
    }
}
