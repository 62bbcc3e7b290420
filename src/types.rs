use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a watch binding fires while its previous run is still in
/// flight.
///
/// - `Queue`: remember the trigger and run the binding once more after the
///   current run finishes. Any number of triggers during one run collapse
///   into a single follow-up run (default behaviour).
/// - `Concurrent`: start another run immediately; both runs proceed side by
///   side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Concurrent,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "concurrent" => Ok(TriggerWhileRunningBehaviour::Concurrent),
            other => Err(format!(
                "invalid triggered_while_running: {other} (expected \"queue\" or \"concurrent\")"
            )),
        }
    }
}

/// Logical asset categories known to the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    Php,
    Styles,
    Sass,
    Scripts,
    ScriptLibs,
    ScriptsMin,
    Images,
    Languages,
    Export,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 9] = [
        AssetCategory::Php,
        AssetCategory::Styles,
        AssetCategory::Sass,
        AssetCategory::Scripts,
        AssetCategory::ScriptLibs,
        AssetCategory::ScriptsMin,
        AssetCategory::Images,
        AssetCategory::Languages,
        AssetCategory::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Php => "php",
            AssetCategory::Styles => "styles",
            AssetCategory::Sass => "sass",
            AssetCategory::Scripts => "scripts",
            AssetCategory::ScriptLibs => "jsLibs",
            AssetCategory::ScriptsMin => "jsMin",
            AssetCategory::Images => "images",
            AssetCategory::Languages => "languages",
            AssetCategory::Export => "export",
        }
    }
}
