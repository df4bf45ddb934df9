use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QrGeneratorConfig {
    /// PNG composited at the center of every generated code when set.
    #[serde(default)]
    pub watermark_path: Option<String>,
    #[serde(default = "default_url")]
    pub default_url: String,
}

impl Default for QrGeneratorConfig {
    fn default() -> Self {
        Self {
            watermark_path: None,
            default_url: default_url(),
        }
    }
}

fn default_url() -> String {
    "https://example.com".to_string()
}
