//! Bootstrap page
//!
//! The page is compiled into the binary and rendered once at startup with
//! the base64 key and IV substituted in. Browsers decrypt every event with
//! that material.

use crate::crypto::CipherConfig;

const TEMPLATE: &str = include_str!("index.html");

const KEY_PLACEHOLDER: &str = "{{KEY}}";
const IV_PLACEHOLDER: &str = "{{IV}}";

/// Render the bootstrap page for the given cipher material
pub fn render_index(config: &CipherConfig) -> String {
    TEMPLATE
        .replace(KEY_PLACEHOLDER, &config.key_base64())
        .replace(IV_PLACEHOLDER, &config.iv_base64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_has_placeholders() {
        assert!(TEMPLATE.contains(KEY_PLACEHOLDER));
        assert!(TEMPLATE.contains(IV_PLACEHOLDER));
        assert!(TEMPLATE.contains("new EventSource('/stream')"));
    }

    #[test]
    fn test_render_embeds_key_and_iv() {
        let config = CipherConfig::new([0xAB; 32], [0x01; 16]);
        let page = render_index(&config);

        assert!(page.contains(&format!("Base64.parse('{}')", config.key_base64())));
        assert!(page.contains(&format!("Base64.parse('{}')", config.iv_base64())));
        assert!(!page.contains(KEY_PLACEHOLDER));
        assert!(!page.contains(IV_PLACEHOLDER));
    }

    #[test]
    fn test_render_drops_and_logs_malformed_events() {
        let page = render_index(&CipherConfig::generate());
        assert!(page.contains("parts.length !== 3"));
        assert!(page.contains("console.error('Malformed event"));
    }

    #[test]
    fn test_render_shows_rate_and_average_latency() {
        let page = render_index(&CipherConfig::generate());
        for id in ["id=\"fps\"", "id=\"enc-avg\"", "id=\"dec-avg\""] {
            assert!(page.contains(id), "missing {}", id);
        }
    }
}
