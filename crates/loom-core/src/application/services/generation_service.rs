//! Generation Service - runs generators against a workspace snapshot.
//!
//! This service coordinates one generation cycle:
//! 1. Snapshot the workspace and subscribe every registered generator
//! 2. Create the output root in a staging tree and announce it
//! 3. Drain the queue of requested artifacts (creating → created)
//! 4. Gather placeholder contents and render templated files
//! 5. Hand back the staging subtree; the caller applies it as one undoable step
//!
//! Files can then be written to disk with rollback on failure.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        generation::{
            ArtifactCreated, ArtifactCreating, GenerationContext, GenerationResult,
            GenerationScope, GenerationSettings, PlaceholderContentRequested, RootArtifactCreated,
        },
        plugins::PluginRegistry,
        ports::{Filesystem, TemplateEngine},
    },
    bus::{Message, MessageBus},
    domain::{
        Artifact, ArtifactId, ArtifactTree, GeneratorBindingDecorator, Value, kinds, model,
        naming::{to_kebab_case, to_pascal_case, to_snake_case},
    },
    error::{LoomError, LoomResult},
};

/// Property holding the unrendered template of a generated file.
pub const TEMPLATE_PROPERTY: &str = "template";
pub const PATH_PROPERTY: &str = "path";
pub const CONTENT_PROPERTY: &str = "content";
pub const EXECUTABLE_PROPERTY: &str = "executable";

const HOST: &str = "loom";

/// What a finished run hands back.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    /// Holds the detached output subtree rooted at `root`.
    pub staging: ArtifactTree,
    pub root: ArtifactId,
}

/// A file ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToWrite {
    pub path: PathBuf,
    pub content: String,
    pub executable: bool,
}

pub struct GenerationService {
    plugins: Arc<PluginRegistry>,
    filesystem: Box<dyn Filesystem>,
    settings: GenerationSettings,
}

impl GenerationService {
    pub fn new(
        plugins: Arc<PluginRegistry>,
        filesystem: Box<dyn Filesystem>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            plugins,
            filesystem,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Run one generation cycle. The workspace tree is only read.
    ///
    /// Handler failures and render errors land in the result; structural
    /// violations and cancellation abort the run.
    #[instrument(skip_all, fields(workspace = %workspace))]
    pub async fn generate(
        &self,
        tree: &ArtifactTree,
        workspace: ArtifactId,
        cancel: &CancellationToken,
    ) -> LoomResult<GenerationOutcome> {
        let snapshot = tree.capture(workspace)?;
        let mut ctx = GenerationContext::new(snapshot, cancel.clone());
        let mut bus = MessageBus::<GenerationScope>::new();

        for generator in self.plugins.generators() {
            let tokens = generator.subscribe(&mut bus);
            debug!(plugin = %generator.manifest(), handlers = tokens.len(), "Generator subscribed");
        }
        info!(
            generators = self.plugins.generators().len(),
            "Starting generation"
        );

        // 1. Output root
        let output = model::output(self.settings.output_name.as_str());
        let root = self
            .create(&mut bus, &mut ctx, None, output, HOST)
            .await?
            .ok_or_else(|| ApplicationError::OperationFailed {
                operation: "generate".into(),
                message: "creation of the output root was vetoed".into(),
            })?;
        ctx.root = Some(root);
        ctx.result.projects.push(self.settings.output_name.clone());

        let mut announced = RootArtifactCreated {
            root,
            workspace: ctx.workspace_name().to_string(),
        };
        dispatch(&mut bus, &mut announced, &mut ctx).await?;

        // 2. Requested artifacts; handlers may queue more while this runs
        let mut processed = 0usize;
        while let Some(pending) = ctx.next_pending() {
            processed += 1;
            if processed > self.settings.max_artifacts {
                ctx.result.error(format!(
                    "more than {} artifacts requested, remaining requests dropped",
                    self.settings.max_artifacts
                ));
                break;
            }
            self.create(
                &mut bus,
                &mut ctx,
                Some(pending.parent),
                pending.artifact,
                &pending.requested_by,
            )
            .await?;
        }

        // 3. Templates
        ensure_running(cancel)?;
        self.render_templates(&mut bus, &mut ctx, root).await?;

        // 4. Run-bound decorators have no meaning outside this run
        for id in ctx.staging.descendants(root) {
            ctx.staging
                .remove_decorator(id, GeneratorBindingDecorator::KIND)?;
        }

        ensure_running(cancel)?;
        ctx.result.finish();
        info!(
            files = ctx.result.files.len(),
            errors = ctx.result.errors.len(),
            warnings = ctx.result.warnings.len(),
            "Generation finished"
        );

        Ok(GenerationOutcome {
            result: ctx.result,
            staging: ctx.staging,
            root,
        })
    }

    /// Announce, insert and link one artifact. `None` when vetoed.
    async fn create(
        &self,
        bus: &mut MessageBus<GenerationScope>,
        ctx: &mut GenerationContext,
        parent: Option<ArtifactId>,
        mut artifact: Artifact,
        requested_by: &str,
    ) -> LoomResult<Option<ArtifactId>> {
        let kind = artifact.kind().to_string();
        let name = artifact.name();

        let mut creating = ArtifactCreating {
            parent,
            kind: kind.clone(),
            name: name.clone(),
            requested_by: requested_by.to_string(),
            cancel: false,
        };
        dispatch(bus, &mut creating, ctx).await?;
        if creating.cancel {
            debug!(%kind, %name, "Creation vetoed");
            ctx.result
                .warn(format!("'{name}' requested by {requested_by} was vetoed"));
            return Ok(None);
        }

        if requested_by != HOST && !artifact.has_decorator::<GeneratorBindingDecorator>() {
            artifact.add_decorator(Box::new(GeneratorBindingDecorator::new(
                requested_by,
                ctx.cancel.clone(),
            )))?;
        }

        let id = ctx.staging.insert(artifact)?;
        if let Some(parent) = parent {
            ctx.staging.add_child(parent, id)?;
        }

        let mut created = ArtifactCreated {
            artifact: id,
            parent,
            kind,
            name,
        };
        dispatch(bus, &mut created, ctx).await?;
        Ok(Some(id))
    }

    async fn render_templates(
        &self,
        bus: &mut MessageBus<GenerationScope>,
        ctx: &mut GenerationContext,
        root: ArtifactId,
    ) -> LoomResult<()> {
        let engine = self.plugins.template_engine();

        for id in ctx.staging.descendants(root) {
            ensure_running(&ctx.cancel)?;
            let Some(file) = ctx.staging.get(id) else {
                continue;
            };
            if file.kind() != kinds::GENERATED_FILE {
                continue;
            }
            let path = file.get_value(PATH_PROPERTY, file.name());
            let template = file
                .properties()
                .get(TEMPLATE_PROPERTY)
                .and_then(Value::as_str)
                .map(str::to_string);

            let Some(template) = template else {
                ctx.result.files.push(path);
                continue;
            };
            let Some(engine) = engine.as_deref() else {
                ctx.result
                    .error(format!("{path}: no template engine registered"));
                continue;
            };

            match self
                .render_file(bus, ctx, engine, id, &path, &template)
                .await?
            {
                Ok(content) => {
                    let node = ctx.staging.require_mut(id)?;
                    node.set_value(CONTENT_PROPERTY, content);
                    node.properties_mut().remove(TEMPLATE_PROPERTY);
                    ctx.result.files.push(path);
                }
                Err(reason) => ctx.result.error(format!("{path}: {reason}")),
            }
        }
        Ok(())
    }

    /// Outer error aborts the run, inner error is reported for this file only.
    async fn render_file(
        &self,
        bus: &mut MessageBus<GenerationScope>,
        ctx: &mut GenerationContext,
        engine: &dyn TemplateEngine,
        artifact: ArtifactId,
        path: &str,
        template: &str,
    ) -> LoomResult<Result<String, LoomError>> {
        let placeholders = engine.placeholders(template);
        let mut request = PlaceholderContentRequested {
            artifact,
            path: path.to_string(),
            placeholders,
            contents: BTreeMap::new(),
        };
        if !request.placeholders.is_empty() {
            dispatch(bus, &mut request, ctx).await?;
        }

        let mut values = request.contents;
        for (key, value) in workspace_variables(ctx.workspace_name()) {
            values.entry(key).or_insert(value);
        }
        for missing in request
            .placeholders
            .iter()
            .filter(|p| !values.contains_key(p.as_str()))
        {
            ctx.result
                .warn(format!("{path}: nothing provided for {{{{{missing}}}}}"));
        }

        Ok(engine.render(template, &values))
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Files under `root` with paths relative to `out_dir`.
    pub fn collect_files(
        tree: &ArtifactTree,
        root: ArtifactId,
        out_dir: &Path,
    ) -> LoomResult<Vec<FileToWrite>> {
        let mut files = Vec::new();
        for id in tree.descendants(root) {
            let node = tree.require(id)?;
            if node.kind() != kinds::GENERATED_FILE {
                continue;
            }
            let relative = PathBuf::from(node.get_value(PATH_PROPERTY, node.name()));
            if relative.is_absolute()
                || relative
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
            {
                return Err(ApplicationError::FilesystemError {
                    path: relative,
                    reason: "generated paths must stay inside the output directory".into(),
                }
                .into());
            }
            files.push(FileToWrite {
                path: out_dir.join(relative),
                content: node.get_value(CONTENT_PROPERTY, String::new()),
                executable: node.get_value(EXECUTABLE_PROPERTY, false),
            });
        }
        Ok(files)
    }

    /// Write the generated files under `out_dir` with rollback on failure.
    #[instrument(skip_all, fields(out_dir = %out_dir.display()))]
    pub fn materialize(
        &self,
        tree: &ArtifactTree,
        root: ArtifactId,
        out_dir: &Path,
    ) -> LoomResult<Vec<PathBuf>> {
        if self.filesystem.exists(out_dir) {
            return Err(ApplicationError::OutputExists {
                path: out_dir.to_path_buf(),
            }
            .into());
        }
        let files = Self::collect_files(tree, root, out_dir)?;

        match self.write_all(out_dir, &files) {
            Ok(()) => {
                info!(files = files.len(), "Successfully wrote all files");
                Ok(files.into_iter().map(|f| f.path).collect())
            }
            Err(e) => {
                warn!("Write failed, attempting rollback");
                self.rollback(out_dir);
                Err(e)
            }
        }
    }

    fn write_all(&self, out_dir: &Path, files: &[FileToWrite]) -> LoomResult<()> {
        self.filesystem.create_dir_all(out_dir)?;

        for file in files {
            if let Some(parent) = file.path.parent() {
                self.filesystem.create_dir_all(parent)?;
            }
            self.filesystem.write_file(&file.path, &file.content)?;

            if file.executable {
                self.filesystem.set_permissions(&file.path, true)?;
            }
        }
        Ok(())
    }

    /// Best-effort rollback on failure.
    fn rollback(&self, root: &Path) {
        if let Err(e) = self.filesystem.remove_dir_all(root) {
            warn!(
                error = %e,
                path = %root.display(),
                "Rollback failed"
            );
        } else {
            info!("Rollback successful");
        }
    }
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("plugins", &self.plugins)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Publish on the generation bus, folding handler failures into the result.
async fn dispatch<E: Message<GenerationScope>>(
    bus: &mut MessageBus<GenerationScope>,
    event: &mut E,
    ctx: &mut GenerationContext,
) -> LoomResult<()> {
    let cancel = ctx.cancel.clone();
    let report = bus.publish_async(event, ctx, &cancel).await?;
    for failure in report.failures {
        ctx.result.error(format!(
            "{} handler {} failed: {}",
            failure.event, failure.token, failure.error
        ));
    }
    Ok(())
}

fn ensure_running(cancel: &CancellationToken) -> LoomResult<()> {
    if cancel.is_cancelled() {
        return Err(ApplicationError::Cancelled.into());
    }
    Ok(())
}

/// Variables every template can use without a generator providing them.
fn workspace_variables(name: &str) -> [(String, String); 4] {
    [
        ("WORKSPACE".to_string(), name.to_string()),
        ("WORKSPACE_SNAKE".to_string(), to_snake_case(name)),
        ("WORKSPACE_KEBAB".to_string(), to_kebab_case(name)),
        ("WORKSPACE_PASCAL".to_string(), to_pascal_case(name)),
    ]
}
