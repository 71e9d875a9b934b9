use crate::error::{BuildError, Result};
use crate::types::{Language, ModuleDescriptor};

/// npm package whose presence requires the AssemblyScript JSON transform.
pub const JSON_TRANSFORM_PACKAGE: &str = "json-as";

/// Derives extra compiler flags from static checks on a module's project
/// files. Returns an empty string when nothing is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerFlagAdvisor;

impl CompilerFlagAdvisor {
    pub fn new() -> Self {
        Self
    }

    pub async fn inspect(&self, module: &ModuleDescriptor) -> Result<String> {
        match module.language()? {
            Language::AssemblyScript => self.assemblyscript_flags(module).await,
            _ => Ok(String::new()),
        }
    }

    async fn assemblyscript_flags(&self, module: &ModuleDescriptor) -> Result<String> {
        let package_json = module.path.join("package.json");
        let contents = tokio::fs::read_to_string(&package_json)
            .await
            .map_err(|source| BuildError::ProjectFileRead {
                path: package_json,
                source,
            })?;

        if contents.contains(JSON_TRANSFORM_PACKAGE) {
            return Ok(format!(
                "--transform ./node_modules/{JSON_TRANSFORM_PACKAGE}/transform"
            ));
        }

        Ok(String::new())
    }
}
