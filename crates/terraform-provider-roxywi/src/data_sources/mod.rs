// Read-only lookups.

use std::sync::Arc;

use tf_provider::Diagnostics;

use roxywi_api::RoxyClient;

use crate::error::ProviderError;
use crate::provider::SharedClient;

pub mod group;
pub mod udp_listener;
pub mod user_role;

fn configured(client: &SharedClient, diags: &mut Diagnostics, name: &str) -> Option<Arc<RoxyClient>> {
    let client = client.load_full();
    if client.is_none() {
        ProviderError::NotConfigured.report(diags, name);
    }
    client
}
