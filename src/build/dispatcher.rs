use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::build::{
    BuildConfig, BuildReporter, CompilerFlagAdvisor, ContainerBuildDispatcher, NativeBuildExecutor,
    PrerequisiteResolver, ResultAggregator, Toolchain, TracingReporter,
};
use crate::error::Result;
use crate::process::{CommandRunner, SystemRunner};
use crate::types::{BuildResult, BuildUnit, Language, ModuleDescriptor};

/// Drives a build pass over a project's modules, natively or in containers,
/// and keeps the results of the latest pass.
pub struct ToolchainDispatcher {
    config: BuildConfig,
    project_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn BuildReporter>,
    results: ResultAggregator,
}

impl ToolchainDispatcher {
    pub fn new(config: BuildConfig, project_root: impl AsRef<Path>) -> Self {
        let runner = Arc::new(SystemRunner::with_timeout(config.command_timeout));
        Self::with_runner(config, project_root, runner)
    }

    pub fn with_runner(
        config: BuildConfig,
        project_root: impl AsRef<Path>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            project_root: project_root.as_ref().to_path_buf(),
            runner,
            reporter: Arc::new(TracingReporter),
            results: ResultAggregator::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build every module admitted by the language filter. The pass stops at
    /// the first error; results recorded up to that point stay available.
    pub async fn run(&mut self, toolchain: Toolchain, modules: &mut [ModuleDescriptor]) -> Result<()> {
        self.results.clear();

        info!(
            "Starting {} build of {} module(s) in {}",
            toolchain,
            modules.len(),
            self.project_root.display()
        );

        match toolchain {
            Toolchain::Native => self.run_native(modules).await,
            Toolchain::Docker => self.run_containerized(modules).await,
        }
    }

    async fn run_native(&mut self, modules: &mut [ModuleDescriptor]) -> Result<()> {
        let resolver = PrerequisiteResolver::new(
            self.config.platform.clone(),
            Arc::clone(&self.runner),
            Arc::clone(&self.reporter),
        );
        let advisor = CompilerFlagAdvisor::new();
        let executor = NativeBuildExecutor::new(Arc::clone(&self.runner));

        for module in modules.iter_mut() {
            if !self.config.languages.admits(&module.lang) {
                debug!("Skipping {} ({})", module.name, module.lang);
                continue;
            }

            self.reporter
                .start(&format!("building runnable: {} ({})", module.name, module.lang));

            let mut result = BuildResult::start(BuildUnit::Module(module.name.clone()));
            let outcome = Self::build_native(&resolver, &advisor, &executor, module, &mut result).await;

            // Failed units are recorded too; their logs are the diagnostics.
            self.results.record(result);
            outcome?;

            self.reporter.done(&format!(
                "{} was built -> {}",
                module.name,
                module.artifact_path().display()
            ));
        }

        Ok(())
    }

    async fn build_native(
        resolver: &PrerequisiteResolver,
        advisor: &CompilerFlagAdvisor,
        executor: &NativeBuildExecutor,
        module: &mut ModuleDescriptor,
        result: &mut BuildResult,
    ) -> Result<()> {
        resolver
            .ensure(module, result)
            .await
            .map_err(|e| e.during(format!("resolve prerequisites for {}", module.name)))?;

        let flags = advisor
            .inspect(module)
            .await
            .map_err(|e| e.during(format!("analyze compiler flags for {}", module.name)))?;
        if !flags.is_empty() {
            module.compiler_flags = flags;
        }

        executor
            .build(module, result)
            .await
            .map_err(|e| e.during(format!("build {}", module.name)))
    }

    async fn run_containerized(&mut self, modules: &[ModuleDescriptor]) -> Result<()> {
        let languages = Self::distinct_languages(&self.config, modules)
            .map_err(|e| e.during("collect container languages"))?;
        let dispatcher = ContainerBuildDispatcher::new(
            self.config.clone(),
            &self.project_root,
            Arc::clone(&self.runner),
        );

        for language in languages {
            self.reporter
                .start(&format!("building {language} runnables in container"));

            let mut result = BuildResult::start(BuildUnit::Language(language));
            let outcome = dispatcher.build_language(language, &mut result).await;

            self.results.record(result);
            outcome.map_err(|e| e.during(format!("build {language} runnables in container")))?;

            self.reporter.done(&format!("{language} runnables built"));
        }

        Ok(())
    }

    /// Distinct languages of the admitted modules, in a stable order.
    pub fn distinct_languages(config: &BuildConfig, modules: &[ModuleDescriptor]) -> Result<BTreeSet<Language>> {
        modules
            .iter()
            .filter(|m| config.languages.admits(&m.lang))
            .map(|m| m.language())
            .collect()
    }

    /// Results of the latest pass, or a state error before anything was built.
    pub fn results(&self) -> Result<Vec<BuildResult>> {
        self.results.snapshot()
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.results
    }
}
