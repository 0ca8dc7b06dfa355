//! Subevent resolution
//!
//! Every subevent runs the same sequence:
//! 1. Discriminator check and nesting guard
//! 2. Bind the source, `prepare` source-side baselines
//! 3. Bind the target, apply matching effects until none newly applies
//! 4. `invoke`: finalize target-dependent values and resolve branches

use tracing::{debug, warn};
use uuid::Uuid;

use super::core::SubeventCore;
use super::error::{Result, SubeventError};
use super::Subevent;
use crate::combat::{Effect, Modification};
use crate::config::EngineConfig;
use crate::document::Document;
use crate::objects::{Context, Registry, RpgObject};

/// A subevent kind's pipeline stages
pub trait Pipeline {
    fn core(&self) -> &SubeventCore;

    fn core_mut(&mut self) -> &mut SubeventCore;

    /// Document effect filters are matched against
    fn view(&self) -> Document {
        self.core().document().clone()
    }

    /// Apply one effect modification; false when it has no meaning here
    fn apply_modification(&mut self, modification: &Modification) -> bool;

    /// Source-side baseline
    fn prepare(&mut self, resolver: &mut Resolver<'_>) -> Result<()>;

    /// Target-dependent values, delivery, and branches
    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()>;
}

/// Drives subevents against a registry and context
pub struct Resolver<'a> {
    registry: &'a mut Registry,
    context: &'a Context,
    config: &'a EngineConfig,
    depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a mut Registry, context: &'a Context, config: &'a EngineConfig) -> Self {
        Self {
            registry,
            context,
            config,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut *self.registry
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Subevents currently on the resolution stack
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn object(&self, uuid: Uuid) -> Result<&RpgObject> {
        Ok(self.registry.get_object(uuid)?)
    }

    pub fn object_mut(&mut self, uuid: Uuid) -> Result<&mut RpgObject> {
        Ok(self.registry.get_object_mut(uuid)?)
    }

    /// Build a subevent from its document and resolve it
    pub fn resolve(
        &mut self,
        document: Document,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> Result<Subevent> {
        let mut subevent = Subevent::from_document(document)?;
        self.run(subevent.pipeline_mut(), source, target)?;
        Ok(subevent)
    }

    /// Resolve an already-built pipeline
    pub fn run(
        &mut self,
        pipeline: &mut dyn Pipeline,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> Result<()> {
        let kind = pipeline.core().kind();
        super::core::check_discriminator(kind, pipeline.core().document())?;

        let limit = self.config.max_nesting_depth;
        if self.depth >= limit {
            warn!(subevent = %kind, limit, "nesting limit reached");
            return Err(SubeventError::NestingTooDeep { limit });
        }

        self.depth += 1;
        let result = self.run_stages(pipeline, source, target);
        self.depth -= 1;
        result
    }

    fn run_stages(
        &mut self,
        pipeline: &mut dyn Pipeline,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> Result<()> {
        debug!(subevent = %pipeline.core().kind(), depth = self.depth, "resolving");
        pipeline.core_mut().bind_source(source);
        pipeline.prepare(self)?;
        pipeline.core_mut().bind_target(target);
        self.process(pipeline)?;
        pipeline.invoke(self)
    }

    /// Effects of the context's objects and both participants, with owners
    fn candidate_effects(&self, core: &SubeventCore) -> Vec<(Uuid, Effect)> {
        let mut owners: Vec<Uuid> = self.context.objects().to_vec();
        for participant in [core.source(), core.target()].into_iter().flatten() {
            if !owners.contains(&participant) {
                owners.push(participant);
            }
        }
        owners
            .into_iter()
            .flat_map(|owner| {
                self.registry
                    .effects_of(owner)
                    .into_iter()
                    .map(move |effect| (owner, effect.clone()))
            })
            .collect()
    }

    /// Apply matching effects until a pass applies nothing new
    pub fn process(&mut self, pipeline: &mut dyn Pipeline) -> Result<()> {
        loop {
            let mut applied = false;
            for (owner, effect) in self.candidate_effects(pipeline.core()) {
                let core = pipeline.core();
                if core.effect_already_applied(&effect) {
                    continue;
                }
                let view = pipeline.view();
                let (source, target) = (core.source(), core.target());
                if !effect.triggers_on(&view, owner, source, target) {
                    continue;
                }

                debug!(effect = %effect.id, uuid = %effect.uuid, subevent = %core.kind(), "applying effect");
                pipeline.core_mut().record_effect(&effect);
                applied = true;
                for modification in effect.matching_modifications(&view, owner, source, target) {
                    self.apply(pipeline, &modification)?;
                }
            }
            if !applied {
                return Ok(());
            }
        }
    }

    fn apply(&mut self, pipeline: &mut dyn Pipeline, modification: &Modification) -> Result<()> {
        match modification {
            Modification::InvokeSubevent { subevent } => {
                let rider = self.resolve_rider(pipeline.core(), subevent.clone())?;
                pipeline.core_mut().push_nested(rider);
            }
            other => {
                if !pipeline.apply_modification(other) {
                    debug!(subevent = %pipeline.core().kind(), ?other, "modification does not apply");
                }
            }
        }
        Ok(())
    }

    /// A rider resolves with its parent's participants and cannot re-apply
    /// anything already applied along its chain
    fn resolve_rider(&mut self, parent: &SubeventCore, document: Document) -> Result<Subevent> {
        let mut rider = Subevent::from_document(document)?;
        rider.core_mut().inherit_applied(parent);
        self.run(rider.pipeline_mut(), parent.source(), parent.target())?;
        Ok(rider)
    }

    /// Resolve every subevent under `branches.<tag>`; a missing tag is a no-op
    pub fn resolve_branch(&mut self, core: &mut SubeventCore, tag: &str) -> Result<usize> {
        core.mark_fired(tag);
        let Some(documents) = core.branch(tag)? else {
            return Ok(0);
        };
        if documents.is_empty() {
            warn!(subevent = %core.kind(), tag, "branch is present but empty");
        }
        debug!(subevent = %core.kind(), tag, count = documents.len(), "resolving branch");

        let count = documents.len();
        for document in documents {
            let mut nested = Subevent::from_document(document)?;
            nested.core_mut().inherit_chain(core);
            self.run(nested.pipeline_mut(), core.source(), core.target())?;
            core.push_nested(nested);
        }
        Ok(count)
    }
}
