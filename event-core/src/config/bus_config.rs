use config::{File, FileFormat, Source};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};

use crate::BUS_CONFIG;
use crate::config::ConfigBuilder;
use crate::subscribe::PostOrder;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(rename = "log-failures")]
    pub log_failures: bool,
    #[serde(rename = "catch-panics")]
    pub catch_panics: bool,
    #[serde(rename = "cache-candidates")]
    pub cache_candidates: bool,
    #[serde(rename = "default-order")]
    pub default_order: PostOrder,
}

impl BusConfig {
    pub fn builder() -> BusConfigBuilder {
        BusConfigBuilder::default()
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            log_failures: true,
            catch_panics: true,
            cache_candidates: true,
            default_order: PostOrder::Normal,
        }
    }
}

/// Layers user sources over the reference `bus.toml`.
pub struct BusConfigBuilder {
    builder: config::ConfigBuilder<DefaultState>,
}

impl Default for BusConfigBuilder {
    fn default() -> Self {
        let builder = config::Config::builder().add_source(File::from_str(BUS_CONFIG, FileFormat::Toml));
        Self { builder }
    }
}

impl ConfigBuilder for BusConfigBuilder {
    type C = BusConfig;

    fn add_source<T>(self, source: T) -> anyhow::Result<Self> where T: Source + Send + Sync + 'static {
        Ok(Self { builder: self.builder.add_source(source) })
    }

    fn build(self) -> anyhow::Result<Self::C> {
        let config = self.builder.build()?.try_deserialize::<BusConfig>()?;
        Ok(config)
    }
}
