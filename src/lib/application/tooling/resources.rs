use crate::constants::RESOURCE_SCHEME;
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

/// Read-only documents exposed next to the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Metrics,
    Health,
    TestExamples,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Metrics, Resource::Health, Resource::TestExamples];

    fn path(self) -> &'static str {
        match self {
            Resource::Metrics => "metrics",
            Resource::Health => "health",
            Resource::TestExamples => "test-examples",
        }
    }

    pub fn uri(self) -> String {
        format!("{RESOURCE_SCHEME}{}", self.path())
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        let path = uri.strip_prefix(RESOURCE_SCHEME)?;
        Self::ALL.into_iter().find(|resource| resource.path() == path)
    }

    pub fn descriptor(self) -> ResourceDescriptor {
        let (name, description) = match self {
            Resource::Metrics => ("System Metrics", "Current request outcome and latency metrics"),
            Resource::Health => ("Health Status", "Readiness, uptime and success rate"),
            Resource::TestExamples => ("Test Examples", "Sample requests for every generation tool"),
        };
        ResourceDescriptor {
            uri: self.uri(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

pub(crate) fn test_examples() -> Value {
    json!({
        "image_generation_test": {
            "tool": "generate_image",
            "params": {
                "request_id": "550e8400-e29b-41d4-a716-446655440000",
                "prompt": "A mystical forest with glowing trees",
                "width": 512,
                "height": 512
            }
        },
        "pdf_conversion_test": {
            "tool": "convert_html_to_pdf",
            "params": {
                "request_id": "550e8400-e29b-41d4-a716-446655440001",
                "html": "<h1>Test Story</h1><p>Once upon a time in Whisperwynd...</p>"
            }
        },
        "integration_test": {
            "tool": "run_integration_test",
            "params": {
                "request_id": "550e8400-e29b-41d4-a716-446655440002",
                "test_type": "both",
                "prompt": "A dragon in the clouds",
                "html": "<h1>Dragon Story</h1><p>The dragon soared through the misty clouds...</p>"
            }
        }
    })
}
