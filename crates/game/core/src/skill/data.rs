//! Runtime instances of skills.

use std::sync::Arc;

use super::{Skill, SkillArgument};
use crate::refs::SkillSourceRef;
use crate::registry::ContentRegistry;
use crate::state::{EntityId, Tick};
use crate::wire::{WireCodec, WireError, WireReader, WireRegistry, WireWriter, put_list, take_list};

/// One use of a skill: who runs it, with what, from where and on which layers.
#[derive(Clone, Debug)]
pub struct SkillData {
    /// Random per-use id, unique among the executor's active skills.
    pub instance: u64,
    pub skill: Arc<dyn Skill>,
    pub executor: EntityId,
    pub args: Vec<SkillArgument>,
    pub source: SkillSourceRef,
    pub layers: Vec<String>,
}

impl SkillData {
    pub fn new(
        instance: u64,
        skill: Arc<dyn Skill>,
        executor: EntityId,
        args: Vec<SkillArgument>,
        source: SkillSourceRef,
    ) -> Self {
        Self {
            instance,
            skill,
            executor,
            args,
            source,
            layers: Vec::new(),
        }
    }

    /// First argument that points at an entity.
    pub fn first_target(&self) -> Option<EntityId> {
        self.args.iter().find_map(SkillArgument::entity)
    }

    /// `[instance:u64][executor:u32][skill][argCount:u8]{arg}[source][layerCount:u8]{layer}`
    pub fn encode(&self, w: &mut WireWriter, registry: &WireRegistry) -> Result<(), WireError> {
        w.put(&self.instance)?;
        w.put(&self.executor.0)?;
        registry.encode_skill(w, self.skill.as_ref())?;
        put_list(w, "skill arguments", &self.args)?;
        self.source.encode(w)?;
        w.put_count("skill layers", self.layers.len())?;
        self.layers.iter().try_for_each(|layer| w.put_str(layer))
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        registry: &WireRegistry,
        content: &ContentRegistry,
    ) -> Result<Self, WireError> {
        let instance = r.take()?;
        let executor = EntityId(r.take()?);
        let skill = registry.decode_skill(r, content)?;
        let args = take_list(r)?;
        let source = SkillSourceRef::decode(r)?;
        let layers = (0..r.take_count()?)
            .map(|_| r.take_string())
            .collect::<Result<_, _>>()?;
        Ok(Self {
            instance,
            skill,
            executor,
            args,
            source,
            layers,
        })
    }
}

impl PartialEq for SkillData {
    fn eq(&self, other: &Self) -> bool {
        self.instance == other.instance
            && self.skill.id() == other.skill.id()
            && self.skill.type_name() == other.skill.type_name()
            && self.executor == other.executor
            && self.args == other.args
            && self.source == other.source
            && self.layers == other.layers
    }
}

/// A running instance held by its executor.
#[derive(Clone, Debug)]
pub struct ActiveSkill {
    pub data: SkillData,
    pub started: Tick,
    /// Tick of the next scheduled execution, `None` once executions are done.
    pub next_execution: Option<Tick>,
    /// Executions still owed after the next one.
    pub remaining: u64,
    pub executions: u32,
}

impl ActiveSkill {
    pub fn occupies(&self, layer: &str) -> bool {
        self.data.layers.iter().any(|l| l == layer)
    }
}
