//! In-memory `Arc<dyn Trait + Send + Sync>` registries keyed by host/channel
//! name, resolved once at startup from configuration (§6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::Channel;
use crate::domain::ports::{ChannelAdapter, ChannelRegistry, Extractor, ExtractorRegistry};

/// Routes a product URL's host to the extractor registered for it.
#[derive(Default)]
pub struct HostExtractorRegistry {
    by_host: HashMap<String, Arc<dyn Extractor>>,
}

impl HostExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, host: impl Into<String>, extractor: Arc<dyn Extractor>) {
        self.by_host.insert(host.into(), extractor);
    }
}

impl ExtractorRegistry for HostExtractorRegistry {
    fn resolve(&self, host: &str) -> Option<Arc<dyn Extractor>> {
        self.by_host.get(host).cloned()
    }
}

/// Routes a notification [`Channel`] to the adapter registered for it.
#[derive(Default)]
pub struct StaticChannelRegistry {
    by_channel: HashMap<Channel, Arc<dyn ChannelAdapter>>,
}

impl StaticChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Channel, adapter: Arc<dyn ChannelAdapter>) {
        self.by_channel.insert(channel, adapter);
    }
}

impl ChannelRegistry for StaticChannelRegistry {
    fn resolve(&self, channel: Channel) -> Option<Arc<dyn ChannelAdapter>> {
        self.by_channel.get(&channel).cloned()
    }
}
