//! Built-in catalog for the video production toolset.
//!
//! Seven categories and forty-one tools. Nine tools load by default: the
//! `discovery`, `core-operations`, and `video-creation` categories.

use serde_json::{Map, Value, json};
use toolset_primitives::{Category, ExclusivityPolicy, ToolName};

use crate::category::{CategoryConfig, SubcategoryConfig};
use crate::error::CatalogResult;
use crate::tool::{ToolDefinition, ToolDescriptor, ToolMetadata};

/// Lists category summaries.
pub const DISCOVER_CAPABILITIES: &str = "discover-capabilities";
/// Activates or deactivates toolsets.
pub const ACTIVATE_TOOLSET: &str = "activate-toolset";
/// Searches the full catalog.
pub const SEARCH_TOOLS: &str = "search-tools";
/// Lists the active tools.
pub const GET_ACTIVE_TOOLS: &str = "get-active-tools";

/// Credential used by the voice tools.
pub const ELEVENLABS_KEY: &str = "elevenlabs";

/// Category definitions for the built-in catalog.
#[must_use]
pub fn categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            Category::Discovery,
            "Discovery",
            "Explore, search, and activate the rest of the catalog",
        )
        .load_by_default()
        .with_exclusivity(ExclusivityPolicy::Permanent),
        CategoryConfig::new(
            Category::CoreOperations,
            "Core operations",
            "Session basics: projects and the active tool listing",
        )
        .load_by_default(),
        CategoryConfig::new(
            Category::VideoCreation,
            "Video creation",
            "Create compositions, preview them, and render videos",
        )
        .load_by_default(),
        CategoryConfig::new(
            Category::StudioManagement,
            "Studio management",
            "Launch, inspect, and stop render-studio instances",
        )
        .with_exclusivity(ExclusivityPolicy::Selective)
        .coexists_with([Category::CoreOperations, Category::VideoCreation])
        .with_subcategory(
            SubcategoryConfig::new("process", "Start, stop, and restart studio processes")
                .with_auto_load(vec![ToolName::from_static("studio-list-instances")]),
        ),
        CategoryConfig::new(
            Category::VoiceGeneration,
            "Voice generation",
            "Text-to-speech voiceovers and sound effects",
        )
        .requires_api_key(ELEVENLABS_KEY)
        .with_subcategory(
            SubcategoryConfig::new("speech", "Synthesize speech and effects")
                .with_auto_load(vec![ToolName::from_static("list-voices")]),
        ),
        CategoryConfig::new(
            Category::AssetGeneration,
            "Asset generation",
            "Images, music, subtitles, and asset management",
        )
        .with_subcategory(
            SubcategoryConfig::new("images", "Generate and edit still images")
                .with_auto_load(vec![ToolName::from_static("list-assets")]),
        ),
        CategoryConfig::new(
            Category::Maintenance,
            "Maintenance",
            "Cleanup, validation, exports, and composition code upkeep",
        )
        .with_subcategory(SubcategoryConfig::new(
            "cleanup",
            "Remove caches, temporary files, and renders",
        )),
    ]
}

struct Entry {
    name: &'static str,
    description: &'static str,
    category: Category,
    subcategory: Option<&'static str>,
    tags: &'static [&'static str],
    priority: i32,
    tokens: u32,
    dependencies: &'static [&'static str],
    api_key: Option<&'static str>,
    params: &'static [(&'static str, &'static str)],
}

const DISCOVERY: &[Entry] = &[
    Entry {
        name: DISCOVER_CAPABILITIES,
        description: "List tool categories with their size, cost, and credential requirements",
        category: Category::Discovery,
        subcategory: None,
        tags: &["discovery", "categories"],
        priority: 0,
        tokens: 320,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: ACTIVATE_TOOLSET,
        description: "Activate categories or tools, optionally replacing the active set, or deactivate them",
        category: Category::Discovery,
        subcategory: None,
        tags: &["discovery", "activation"],
        priority: 1,
        tokens: 410,
        dependencies: &[],
        api_key: None,
        params: &[
            ("categories", "array"),
            ("tools", "array"),
            ("exclusive", "boolean"),
            ("allow_override", "boolean"),
            ("deactivate", "array"),
        ],
    },
    Entry {
        name: SEARCH_TOOLS,
        description: "Search every registered tool by text, category, tags, or credential availability",
        category: Category::Discovery,
        subcategory: None,
        tags: &["discovery", "search"],
        priority: 2,
        tokens: 360,
        dependencies: &[],
        api_key: None,
        params: &[
            ("query", "string"),
            ("categories", "array"),
            ("tags", "array"),
            ("has_api_key", "boolean"),
            ("limit", "integer"),
        ],
    },
    Entry {
        name: GET_ACTIVE_TOOLS,
        description: "List the currently active tools and the context budget they consume",
        category: Category::CoreOperations,
        subcategory: None,
        tags: &["discovery", "status"],
        priority: 3,
        tokens: 240,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
];

const MEDIA: &[Entry] = &[
    // core-operations
    Entry {
        name: "list-projects",
        description: "List video projects in the workspace",
        category: Category::CoreOperations,
        subcategory: None,
        tags: &["project", "list"],
        priority: 10,
        tokens: 260,
        dependencies: &[],
        api_key: None,
        params: &[("path", "string")],
    },
    // video-creation
    Entry {
        name: "create-video",
        description: "Create a new composition from a script and scene list",
        category: Category::VideoCreation,
        subcategory: None,
        tags: &["video", "composition", "create"],
        priority: 20,
        tokens: 520,
        dependencies: &[],
        api_key: None,
        params: &[("title", "string"), ("scenes", "array"), ("fps", "integer")],
    },
    Entry {
        name: "render-video",
        description: "Render a composition to a video file",
        category: Category::VideoCreation,
        subcategory: None,
        tags: &["video", "render"],
        priority: 21,
        tokens: 480,
        dependencies: &["create-video"],
        api_key: None,
        params: &[("composition", "string"), ("codec", "string"), ("output", "string")],
    },
    Entry {
        name: "preview-composition",
        description: "Open a live preview of a composition",
        category: Category::VideoCreation,
        subcategory: None,
        tags: &["video", "preview"],
        priority: 22,
        tokens: 300,
        dependencies: &["create-video"],
        api_key: None,
        params: &[("composition", "string")],
    },
    Entry {
        name: "get-render-status",
        description: "Report progress of a running render",
        category: Category::VideoCreation,
        subcategory: None,
        tags: &["video", "render", "status"],
        priority: 23,
        tokens: 220,
        dependencies: &["render-video"],
        api_key: None,
        params: &[("render_id", "string")],
    },
    // studio-management
    Entry {
        name: "studio-launch",
        description: "Start a render-studio instance on a free port",
        category: Category::StudioManagement,
        subcategory: Some("process"),
        tags: &["studio", "process", "start"],
        priority: 30,
        tokens: 380,
        dependencies: &[],
        api_key: None,
        params: &[("project", "string"), ("port", "integer")],
    },
    Entry {
        name: "studio-stop",
        description: "Stop a running render-studio instance",
        category: Category::StudioManagement,
        subcategory: Some("process"),
        tags: &["studio", "process", "stop"],
        priority: 31,
        tokens: 240,
        dependencies: &[],
        api_key: None,
        params: &[("pid", "integer")],
    },
    Entry {
        name: "studio-restart",
        description: "Restart a render-studio instance, keeping its port",
        category: Category::StudioManagement,
        subcategory: Some("process"),
        tags: &["studio", "process"],
        priority: 32,
        tokens: 260,
        dependencies: &["studio-stop", "studio-launch"],
        api_key: None,
        params: &[("pid", "integer")],
    },
    Entry {
        name: "studio-list-instances",
        description: "List running render-studio instances with their ports",
        category: Category::StudioManagement,
        subcategory: None,
        tags: &["studio", "list", "status"],
        priority: 33,
        tokens: 280,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: "studio-find-port",
        description: "Find the port a studio instance for a project listens on",
        category: Category::StudioManagement,
        subcategory: None,
        tags: &["studio", "port"],
        priority: 34,
        tokens: 220,
        dependencies: &[],
        api_key: None,
        params: &[("project", "string")],
    },
    Entry {
        name: "studio-logs",
        description: "Tail the log output of a studio instance",
        category: Category::StudioManagement,
        subcategory: None,
        tags: &["studio", "logs"],
        priority: 35,
        tokens: 300,
        dependencies: &[],
        api_key: None,
        params: &[("pid", "integer"), ("lines", "integer")],
    },
    // voice-generation
    Entry {
        name: "generate-voiceover",
        description: "Synthesize a narration track from text",
        category: Category::VoiceGeneration,
        subcategory: Some("speech"),
        tags: &["voice", "tts", "audio"],
        priority: 40,
        tokens: 450,
        dependencies: &["list-voices"],
        api_key: Some(ELEVENLABS_KEY),
        params: &[("text", "string"), ("voice_id", "string")],
    },
    Entry {
        name: "generate-sound-effect",
        description: "Generate a short sound effect from a prompt",
        category: Category::VoiceGeneration,
        subcategory: Some("speech"),
        tags: &["audio", "sfx"],
        priority: 41,
        tokens: 380,
        dependencies: &[],
        api_key: Some(ELEVENLABS_KEY),
        params: &[("prompt", "string"), ("duration", "number")],
    },
    Entry {
        name: "list-voices",
        description: "List voices available to the speech provider",
        category: Category::VoiceGeneration,
        subcategory: None,
        tags: &["voice", "list"],
        priority: 42,
        tokens: 260,
        dependencies: &[],
        api_key: Some(ELEVENLABS_KEY),
        params: &[],
    },
    Entry {
        name: "clone-voice",
        description: "Create a custom voice from sample recordings",
        category: Category::VoiceGeneration,
        subcategory: None,
        tags: &["voice", "clone"],
        priority: 43,
        tokens: 420,
        dependencies: &["list-voices"],
        api_key: Some(ELEVENLABS_KEY),
        params: &[("name", "string"), ("samples", "array")],
    },
    Entry {
        name: "get-voice-settings",
        description: "Read stability and similarity settings of a voice",
        category: Category::VoiceGeneration,
        subcategory: None,
        tags: &["voice", "settings"],
        priority: 44,
        tokens: 240,
        dependencies: &[],
        api_key: Some(ELEVENLABS_KEY),
        params: &[("voice_id", "string")],
    },
    // asset-generation
    Entry {
        name: "generate-image",
        description: "Generate a still image from a prompt",
        category: Category::AssetGeneration,
        subcategory: Some("images"),
        tags: &["image", "generate"],
        priority: 50,
        tokens: 460,
        dependencies: &[],
        api_key: None,
        params: &[("prompt", "string"), ("width", "integer"), ("height", "integer")],
    },
    Entry {
        name: "edit-image",
        description: "Edit a generated image with a follow-up prompt",
        category: Category::AssetGeneration,
        subcategory: Some("images"),
        tags: &["image", "edit"],
        priority: 51,
        tokens: 420,
        dependencies: &["generate-image"],
        api_key: None,
        params: &[("image", "string"), ("prompt", "string")],
    },
    Entry {
        name: "upscale-image",
        description: "Upscale an image to a larger resolution",
        category: Category::AssetGeneration,
        subcategory: Some("images"),
        tags: &["image", "upscale"],
        priority: 52,
        tokens: 300,
        dependencies: &[],
        api_key: None,
        params: &[("image", "string"), ("factor", "integer")],
    },
    Entry {
        name: "remove-background",
        description: "Cut the background out of an image",
        category: Category::AssetGeneration,
        subcategory: Some("images"),
        tags: &["image", "background"],
        priority: 53,
        tokens: 300,
        dependencies: &[],
        api_key: None,
        params: &[("image", "string")],
    },
    Entry {
        name: "generate-subtitles",
        description: "Produce timed subtitles for an audio or video file",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["subtitles", "captions"],
        priority: 54,
        tokens: 380,
        dependencies: &[],
        api_key: None,
        params: &[("media", "string"), ("language", "string")],
    },
    Entry {
        name: "import-asset",
        description: "Copy an external file into the project's asset folder",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["asset", "import"],
        priority: 55,
        tokens: 280,
        dependencies: &[],
        api_key: None,
        params: &[("source", "string")],
    },
    Entry {
        name: "list-assets",
        description: "List assets available to compositions",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["asset", "list"],
        priority: 56,
        tokens: 200,
        dependencies: &[],
        api_key: None,
        params: &[("kind", "string")],
    },
    Entry {
        name: "optimize-asset",
        description: "Compress an asset for faster rendering",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["asset", "optimize"],
        priority: 57,
        tokens: 260,
        dependencies: &[],
        api_key: None,
        params: &[("asset", "string")],
    },
    Entry {
        name: "generate-thumbnail",
        description: "Render a thumbnail frame from a composition",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["image", "thumbnail"],
        priority: 58,
        tokens: 320,
        dependencies: &["render-video"],
        api_key: None,
        params: &[("composition", "string"), ("frame", "integer")],
    },
    Entry {
        name: "create-color-palette",
        description: "Derive a color palette from an image or brief",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["design", "color"],
        priority: 59,
        tokens: 240,
        dependencies: &[],
        api_key: None,
        params: &[("source", "string")],
    },
    Entry {
        name: "convert-asset-format",
        description: "Convert an asset between media formats",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["asset", "convert"],
        priority: 60,
        tokens: 280,
        dependencies: &[],
        api_key: None,
        params: &[("asset", "string"), ("format", "string")],
    },
    Entry {
        name: "generate-music-track",
        description: "Generate a background music track",
        category: Category::AssetGeneration,
        subcategory: None,
        tags: &["audio", "music"],
        priority: 61,
        tokens: 400,
        dependencies: &[],
        api_key: None,
        params: &[("mood", "string"), ("duration", "number")],
    },
    // maintenance
    Entry {
        name: "clean-render-cache",
        description: "Delete cached render frames",
        category: Category::Maintenance,
        subcategory: Some("cleanup"),
        tags: &["cleanup", "cache"],
        priority: 70,
        tokens: 220,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: "clean-temp-files",
        description: "Delete temporary working files",
        category: Category::Maintenance,
        subcategory: Some("cleanup"),
        tags: &["cleanup", "files"],
        priority: 71,
        tokens: 200,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: "delete-render",
        description: "Delete a finished render",
        category: Category::Maintenance,
        subcategory: Some("cleanup"),
        tags: &["cleanup", "render"],
        priority: 72,
        tokens: 240,
        dependencies: &["list-renders"],
        api_key: None,
        params: &[("render_id", "string")],
    },
    Entry {
        name: "list-renders",
        description: "List finished renders with their sizes",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["render", "list"],
        priority: 73,
        tokens: 220,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: "rewrite-composition-code",
        description: "Apply a structured rewrite to generated composition source code",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["code", "composition", "rewrite"],
        priority: 74,
        tokens: 560,
        dependencies: &[],
        api_key: None,
        params: &[("file", "string"), ("instructions", "string")],
    },
    Entry {
        name: "validate-composition",
        description: "Type-check and lint a composition before rendering",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["code", "composition", "validate"],
        priority: 75,
        tokens: 340,
        dependencies: &[],
        api_key: None,
        params: &[("composition", "string")],
    },
    Entry {
        name: "export-project",
        description: "Bundle a project and its assets into an archive",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["project", "export"],
        priority: 76,
        tokens: 300,
        dependencies: &[],
        api_key: None,
        params: &[("project", "string"), ("destination", "string")],
    },
    Entry {
        name: "check-dependencies",
        description: "Check installed rendering dependencies and their versions",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["environment", "dependencies"],
        priority: 77,
        tokens: 260,
        dependencies: &[],
        api_key: None,
        params: &[],
    },
    Entry {
        name: "get-server-logs",
        description: "Read recent log lines from this server",
        category: Category::Maintenance,
        subcategory: None,
        tags: &["logs", "server"],
        priority: 78,
        tokens: 280,
        dependencies: &[],
        api_key: None,
        params: &[("lines", "integer")],
    },
];

/// The always-available discovery operations.
///
/// `get-active-tools` lives in `core-operations` but is pinned permanent.
///
/// # Errors
///
/// Propagates metadata validation failures.
pub fn discovery_tools() -> CatalogResult<Vec<ToolDefinition>> {
    DISCOVERY
        .iter()
        .map(|entry| {
            to_definition(entry).map(|mut definition| {
                definition.metadata = definition
                    .metadata
                    .with_exclusivity(ExclusivityPolicy::Permanent);
                definition
            })
        })
        .collect()
}

/// The thirty-seven media tools whose handlers are supplied by the host.
///
/// # Errors
///
/// Propagates metadata validation failures.
pub fn media_tools() -> CatalogResult<Vec<ToolDefinition>> {
    MEDIA.iter().map(to_definition).collect()
}

fn to_definition(entry: &Entry) -> CatalogResult<ToolDefinition> {
    let name = ToolName::new(entry.name)?;
    let dependencies = entry
        .dependencies
        .iter()
        .map(|dep| ToolName::new(*dep))
        .collect::<Result<Vec<_>, _>>()?;

    let mut metadata = ToolMetadata::new(entry.category, entry.tokens)?
        .with_tags(entry.tags.iter().copied())
        .with_priority(entry.priority)
        .with_dependencies(dependencies);
    if let Some(subcategory) = entry.subcategory {
        metadata = metadata.with_subcategory(subcategory)?;
    }
    if let Some(key) = entry.api_key {
        metadata = metadata.requires_api_key(key);
    }

    let descriptor =
        ToolDescriptor::new(name, entry.description).with_input_schema(object_schema(entry.params));
    Ok(ToolDefinition::new(descriptor, metadata))
}

fn object_schema(params: &[(&str, &str)]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|(name, kind)| ((*name).to_owned(), json!({ "type": kind })))
        .collect();
    json!({ "type": "object", "properties": properties })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn catalog_has_forty_one_unique_tools() {
        let mut all = discovery_tools().unwrap();
        all.extend(media_tools().unwrap());
        assert_eq!(all.len(), 41);

        let names: BTreeSet<_> = all.iter().map(|d| d.name().clone()).collect();
        assert_eq!(names.len(), 41);
    }

    #[test]
    fn dependencies_and_companions_name_catalog_tools() {
        let mut all = discovery_tools().unwrap();
        all.extend(media_tools().unwrap());
        let names: BTreeSet<_> = all.iter().map(|d| d.name().clone()).collect();

        for definition in &all {
            for dep in definition.metadata.dependencies() {
                assert!(names.contains(dep), "{dep} is not in the catalog");
            }
        }
        for category in categories() {
            for sub in &category.subcategories {
                for companion in &sub.auto_load {
                    assert!(names.contains(companion), "{companion} is not in the catalog");
                }
            }
        }
    }

    #[test]
    fn subcategories_are_declared() {
        let categories = categories();
        for definition in media_tools().unwrap() {
            if let Some(sub) = definition.metadata.subcategory() {
                let owner = categories
                    .iter()
                    .find(|c| c.id == definition.metadata.category())
                    .unwrap();
                assert!(owner.subcategory(sub).is_some(), "{sub} undeclared");
            }
        }
    }

    #[test]
    fn discovery_tools_are_permanent() {
        for definition in discovery_tools().unwrap() {
            assert_eq!(
                definition.metadata.exclusivity_override(),
                Some(ExclusivityPolicy::Permanent)
            );
        }
    }

    #[test]
    fn voice_tools_need_elevenlabs() {
        let voice: Vec<_> = media_tools()
            .unwrap()
            .into_iter()
            .filter(|d| d.metadata.category() == Category::VoiceGeneration)
            .collect();
        assert_eq!(voice.len(), 5);
        assert!(voice
            .iter()
            .all(|d| d.metadata.required_api_key() == Some(ELEVENLABS_KEY)));
    }
}
