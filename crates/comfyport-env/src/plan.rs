//! Architecture-conditional package selection.

use comfyport_core::config::EnvironmentConfig;
use comfyport_core::requirements::{Requirement, RequirementSet};
use comfyport_core::target::BuildTarget;
use comfyport_util::errors::PortableError;

/// Everything that goes into the portable interpreter for one target.
#[derive(Debug, Clone)]
pub struct EnvironmentPlan {
    pub target: BuildTarget,
    /// Python version spec handed to conda (`3.10`).
    pub python: String,
    /// Extra conda specs, one per package name.
    pub conda_specs: Vec<String>,
    /// pip requirements with every applicable override applied.
    pub requirements: RequirementSet,
}

impl EnvironmentPlan {
    /// Apply every override whose target pattern selects `target`, in
    /// declaration order, on top of the base requirement list.
    pub fn resolve(
        target: BuildTarget,
        config: &EnvironmentConfig,
        base: RequirementSet,
    ) -> Result<Self, PortableError> {
        let mut requirements = base;
        let mut conda_specs: Vec<String> = Vec::new();

        for over in config.overrides.iter().filter(|o| o.applies_to(&target)) {
            tracing::info!("Applying environment override '{}' for {target}", over.target);

            for spec in &over.conda {
                let name = conda_package_name(spec);
                match conda_specs.iter_mut().find(|s| conda_package_name(s) == name) {
                    Some(existing) => *existing = spec.clone(),
                    None => conda_specs.push(spec.clone()),
                }
            }

            let pip = over
                .pip
                .iter()
                .map(|s| Requirement::parse(s))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| PortableError::ConfigInvalid {
                    message: format!("override '{}': {e}", over.target),
                })?;
            requirements.apply_overrides(&pip);

            if let Some(ref url) = over.extra_index_url {
                let option = format!("--extra-index-url {url}");
                if !requirements.options.contains(&option) {
                    requirements.options.push(option);
                }
            }
        }

        Ok(Self {
            target,
            python: config.python.clone(),
            conda_specs,
            requirements,
        })
    }

    /// Arguments for the `conda install` call that pins Python and the conda specs.
    pub fn conda_install_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "--yes".to_string(),
            format!("python={}", self.python),
        ];
        args.extend(self.conda_specs.iter().cloned());
        args
    }
}

/// Package name part of a conda match spec (`libblas=*=*accelerate` → `libblas`).
pub fn conda_package_name(spec: &str) -> &str {
    let spec = spec.trim();
    let end = spec
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | ' ' | '['))
        .unwrap_or(spec.len());
    &spec[..end]
}
