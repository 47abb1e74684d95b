//! The board: entity arena, simulated clock and deferred tasks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{ChangeEvent, Entity, EntityId, EntitySnapshot, Item, ItemId, ItemProperty, Tick};
use crate::config::EngineConfig;
use crate::feature::{Feature, FeatureData, FeatureHolder, dispatch};
use crate::refs::{EntityRef, FeatureContainerRef, SkillSourceRef, SkillTreeEntryRef};
use crate::registry::ContentRegistry;
use crate::skill::Skill;
use crate::stats::{StatBlock, names};

/// Deferred work run against the board at a future tick.
pub type Task = Box<dyn FnOnce(&mut Board) + Send>;

/// Level of a board. Entities on different floors never see each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub name: String,
    pub level: i32,
}

impl Floor {
    pub fn new(name: impl Into<String>, level: i32) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

/// Authoritative state of one game board.
///
/// The board owns every entity; other objects point at entities through
/// [`EntityId`]s or reference types and re-resolve on use. All mutation goes
/// through `&mut Board`, so a board has exactly one writer at a time.
pub struct Board {
    name: String,
    config: EngineConfig,
    tick: Tick,
    entities: BTreeMap<EntityId, Entity>,
    next_entity: u32,
    next_item: u32,
    floors: Vec<Floor>,
    /// Keyed by (due tick, insertion sequence).
    tasks: BTreeMap<(Tick, u64), Task>,
    next_task: u64,
    changes: Vec<ChangeEvent>,
    rng: StdRng,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name)
            .field("tick", &self.tick)
            .field("entities", &self.entities.len())
            .field("pending_tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Board {
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Self {
        Self::with_rng(name, config, StdRng::from_entropy())
    }

    /// Board whose dice and instance ids are reproducible.
    pub fn with_seed(name: impl Into<String>, config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(name, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: impl Into<String>, config: EngineConfig, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            config,
            tick: Tick::ZERO,
            entities: BTreeMap::new(),
            next_entity: 1,
            next_item: 1,
            floors: vec![Floor::new("ground", 0)],
            tasks: BTreeMap::new(),
            next_task: 0,
            changes: Vec::new(),
            rng,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Registers `entity` and returns its freshly assigned id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        entity.id = id;
        for item in &mut entity.items {
            item.id = ItemId(self.next_item);
            self.next_item += 1;
        }
        self.record(ChangeEvent::EntityAdded {
            entity: id,
            kind: entity.kind,
            name: entity.name.clone(),
        });
        tracing::debug!(entity = %id, name = %entity.name, "entity spawned");
        self.entities.insert(id, entity);
        id
    }

    /// Removes an entity. References to it stop resolving.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.record(ChangeEvent::EntityRemoved { entity: id });
        Some(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Reference to `id` on this board. Does not check that it exists.
    pub fn entity_ref(&self, id: EntityId) -> EntityRef {
        EntityRef::new(self.name.clone(), id)
    }

    pub fn snapshot(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entity(id).map(Entity::snapshot)
    }

    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.entities.values().map(Entity::snapshot).collect()
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }

    pub fn add_floor(&mut self, floor: Floor) -> usize {
        self.floors.push(floor);
        self.floors.len() - 1
    }

    /// Whether `viewer` can see `target`: same floor, target visible (or the
    /// viewer itself) and within the viewer's `sight` stat when it has one.
    pub fn can_see(&self, viewer: EntityId, target: EntityId) -> bool {
        let (Some(from), Some(to)) = (self.entity(viewer), self.entity(target)) else {
            return false;
        };
        if viewer == target {
            return true;
        }
        if !to.visible || from.floor != to.floor {
            return false;
        }
        from.stats
            .value(names::SIGHT)
            .is_none_or(|sight| from.position.distance(to.position) <= sight)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn set_stat_base(&mut self, id: EntityId, stat: &str, value: f32) -> bool {
        match self.entity_mut(id) {
            Some(entity) => {
                entity.stats.set_base(stat, value);
                true
            }
            None => false,
        }
    }

    pub fn stat_value(&self, id: EntityId, stat: &str) -> Option<f32> {
        self.entity(id)?.stats.value(stat)
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Puts `item` into `holder`'s inventory under a new id.
    pub fn give_item(&mut self, holder: EntityId, mut item: Item) -> Option<ItemId> {
        let id = ItemId(self.next_item);
        let entity = self.entities.get_mut(&holder)?;
        self.next_item += 1;
        item.id = id;
        item.equipped = None;
        let name = item.name.clone();
        entity.items.push(item);
        self.record(ChangeEvent::ItemGiven {
            entity: holder,
            item: id,
            name,
        });
        Some(id)
    }

    /// Wears `item` in `slot`. The item must list the slot, and a creature's
    /// body must have that slot free.
    pub fn equip(&mut self, holder: EntityId, item: ItemId, slot: &str) -> bool {
        let Some(entity) = self.entities.get_mut(&holder) else {
            return false;
        };
        let Entity {
            items,
            stats,
            vitals,
            ..
        } = entity;
        let Some(worn) = items.iter_mut().find(|i| i.id == item) else {
            return false;
        };
        if worn.is_equipped() || !worn.fits(slot) {
            return false;
        }
        if let Some(body) = vitals.body_mut() {
            match body.slot_mut(slot) {
                Some(hosted) if hosted.item.is_none() => hosted.item = Some(item),
                _ => return false,
            }
        }
        worn.equipped = Some(slot.to_string());
        worn.features.apply_modifiers(stats);
        self.record(ChangeEvent::ItemEquipped {
            entity: holder,
            item,
            slot: Some(slot.to_string()),
        });
        true
    }

    pub fn unequip(&mut self, holder: EntityId, item: ItemId) -> bool {
        let Some(entity) = self.entities.get_mut(&holder) else {
            return false;
        };
        let Entity {
            items,
            stats,
            vitals,
            ..
        } = entity;
        let Some(worn) = items.iter_mut().find(|i| i.id == item) else {
            return false;
        };
        let Some(slot) = worn.equipped.take() else {
            return false;
        };
        if let Some(hosted) = vitals.body_mut().and_then(|body| body.slot_mut(&slot)) {
            hosted.item = None;
        }
        worn.features.strip_modifiers(stats);
        self.record(ChangeEvent::ItemEquipped {
            entity: holder,
            item,
            slot: None,
        });
        true
    }

    /// Skills `id` can start right now, with what grants each: unlocked
    /// skill-tree entries, then weapons (equipped ones, or any weapon that is
    /// not wearable at all).
    pub fn available_skills(
        &self,
        id: EntityId,
        registry: &ContentRegistry,
    ) -> Vec<(Arc<dyn Skill>, SkillSourceRef)> {
        let Some(entity) = self.entity(id) else {
            return Vec::new();
        };
        let owner = self.entity_ref(id);
        let mut skills = Vec::new();
        for entry in entity.skill_tree.iter().filter(|e| e.unlocked) {
            if let Some(skill) = registry.entry::<dyn Skill>(&entry.skill) {
                let source = SkillSourceRef::SkillTreeEntry(SkillTreeEntryRef {
                    entity: owner.clone(),
                    entry: entry.id.clone(),
                });
                skills.push((skill, source));
            }
        }
        for item in entity.items() {
            let wearable = item
                .properties
                .iter()
                .any(|p| matches!(p, ItemProperty::Equipment { .. }));
            let source = match (item.is_equipped(), wearable) {
                (true, _) => SkillSourceRef::EquipmentProperty(owner.item(item.id)),
                (false, false) => SkillSourceRef::Item(owner.item(item.id)),
                (false, true) => continue,
            };
            for skill_id in item.granted_skills() {
                if let Some(skill) = registry.entry::<dyn Skill>(skill_id) {
                    skills.push((skill, source.clone()));
                }
            }
        }
        skills
    }

    // ========================================================================
    // Features
    // ========================================================================

    /// Holder and the stat block its modifiers land on. Unequipped items
    /// keep their features but lend no modifiers.
    fn holder_parts(
        &mut self,
        container: &FeatureContainerRef,
    ) -> Option<(&mut FeatureHolder, Option<&mut StatBlock>)> {
        let entity = container.entity().resolve_mut(self)?;
        match container {
            FeatureContainerRef::Entity(_) => Some((&mut entity.features, Some(&mut entity.stats))),
            FeatureContainerRef::Item(item) => {
                let Entity { items, stats, .. } = entity;
                let item = items.iter_mut().find(|i| i.id == item.item)?;
                let stats = if item.is_equipped() { Some(stats) } else { None };
                Some((&mut item.features, stats))
            }
        }
    }

    fn holder(&self, container: &FeatureContainerRef) -> Option<&FeatureHolder> {
        let entity = container.entity().resolve(self)?;
        match container {
            FeatureContainerRef::Entity(_) => Some(&entity.features),
            FeatureContainerRef::Item(item) => Some(&entity.item(item.item)?.features),
        }
    }

    /// Attaches and enables `feature`. False if the holder is missing, full,
    /// or already has a feature with that id.
    pub fn add_feature(
        &mut self,
        container: impl Into<FeatureContainerRef>,
        feature: Arc<dyn Feature>,
    ) -> bool {
        let container = container.into();
        let tick = self.tick;
        let max = self.config.max_features_per_holder;
        let Some((holder, stats)) = self.holder_parts(&container) else {
            return false;
        };
        if holder.len() >= max {
            tracing::warn!(%container, feature = feature.id(), max, "feature limit reached");
            return false;
        }
        holder.add(feature, stats, tick)
    }

    pub fn remove_feature(&mut self, container: impl Into<FeatureContainerRef>, id: &str) -> bool {
        let container = container.into();
        self.holder_parts(&container)
            .is_some_and(|(holder, stats)| holder.remove(id, stats))
    }

    pub fn enable_feature(&mut self, container: impl Into<FeatureContainerRef>, id: &str) -> bool {
        let container = container.into();
        let tick = self.tick;
        self.holder_parts(&container)
            .is_some_and(|(holder, stats)| holder.enable(id, stats, tick))
    }

    pub fn disable_feature(&mut self, container: impl Into<FeatureContainerRef>, id: &str) -> bool {
        let container = container.into();
        self.holder_parts(&container)
            .is_some_and(|(holder, stats)| holder.disable(id, stats))
    }

    pub fn has_feature(&self, container: impl Into<FeatureContainerRef>, id: &str) -> bool {
        self.holder(&container.into())
            .is_some_and(|holder| holder.has(id))
    }

    /// The attached feature `id`, enabled or not.
    pub fn feature(&self, container: &FeatureContainerRef, id: &str) -> Option<Arc<dyn Feature>> {
        self.holder(container)?.get(id).cloned()
    }

    /// Detaches `id` once the current hook chain has finished.
    pub fn remove_feature_later(&mut self, container: FeatureContainerRef, id: String) {
        self.run_task_later(0, move |board| {
            board.remove_feature(container, &id);
        });
    }

    pub fn feature_data(&self, container: &FeatureContainerRef) -> Option<&FeatureData> {
        self.holder(container).map(FeatureHolder::data)
    }

    pub fn feature_data_mut(&mut self, container: &FeatureContainerRef) -> Option<&mut FeatureData> {
        self.holder_parts(container)
            .map(|(holder, _)| holder.data_mut())
    }

    pub fn enabled_features(&self, container: &FeatureContainerRef) -> Vec<Arc<dyn Feature>> {
        self.holder(container)
            .map(FeatureHolder::enabled)
            .unwrap_or_default()
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Advances simulated time by one tick.
    ///
    /// # Order
    ///
    /// 1. `on_tick` for every enabled feature of every entity, by entity id
    /// 2. deferred tasks due at the current tick, including zero-delay tasks
    ///    scheduled while draining
    /// 3. the tick counter moves on
    pub fn process_tick(&mut self) {
        for id in self.entity_ids() {
            dispatch::notify_tick(self, id);
        }
        self.flush_due_tasks();
        self.tick = self.tick.after(1);
    }

    /// Schedules `task` to run `delay` ticks from now. Tasks due on the same
    /// tick run in scheduling order; a zero delay runs at the next drain.
    pub fn run_task_later<F>(&mut self, delay: u64, task: F)
    where
        F: FnOnce(&mut Board) + Send + 'static,
    {
        let key = (self.tick.after(delay), self.next_task);
        self.next_task += 1;
        self.tasks.insert(key, Box::new(task));
    }

    /// Runs every task due at or before the current tick.
    pub fn flush_due_tasks(&mut self) {
        while let Some((&(due, _), _)) = self.tasks.first_key_value() {
            if due > self.tick {
                break;
            }
            if let Some((_, task)) = self.tasks.pop_first() {
                task(self);
            }
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    // ========================================================================
    // Journal and dice
    // ========================================================================

    pub fn record(&mut self, event: ChangeEvent) {
        self.changes.push(event);
    }

    /// Takes every change since the last drain, including the stat and
    /// feature journals of each entity and item.
    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        let mut changes = std::mem::take(&mut self.changes);
        let board = self.name.clone();
        for (&id, entity) in &mut self.entities {
            let owner = EntityRef::new(board.clone(), id);
            changes.extend(
                entity
                    .stats
                    .drain_changes()
                    .into_iter()
                    .map(|change| ChangeEvent::Stat { entity: id, change }),
            );
            changes.extend(entity.features.drain_changes().into_iter().map(|change| {
                ChangeEvent::Feature {
                    container: owner.clone().into(),
                    change,
                }
            }));
            for item in &mut entity.items {
                let container = FeatureContainerRef::from(owner.item(item.id));
                changes.extend(item.features.drain_changes().into_iter().map(|change| {
                    ChangeEvent::Feature {
                        container: container.clone(),
                        change,
                    }
                }));
            }
        }
        changes
    }

    /// Uniform roll in `1..=sides`; zero for a zero-sided die.
    pub fn roll(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rng.gen_range(1..=sides)
    }

    /// Random nonzero id not used by any running skill of `executor`.
    pub(crate) fn next_skill_instance(&mut self, executor: EntityId) -> u64 {
        loop {
            let candidate: u64 = self.rng.r#gen();
            let taken = self.entity(executor).is_some_and(|entity| {
                entity
                    .active_skills
                    .iter()
                    .any(|active| active.data.instance == candidate)
            });
            if candidate != 0 && !taken {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::feature::{FeatureChange, FeatureMeta, SimpleFeature};
    use crate::state::{Body, EntityKind, SkillTreeEntry, Vec3, Vitals};
    use crate::stats::StatModifier;

    fn board() -> Board {
        Board::with_seed("table", EngineConfig::default(), 7)
    }

    #[test]
    fn tasks_run_in_due_then_schedule_order() {
        let mut board = board();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (delay, label) in [(1, "b"), (0, "a"), (1, "c")] {
            let log = Arc::clone(&log);
            board.run_task_later(delay, move |_| log.lock().expect("lock").push(label));
        }
        board.process_tick();
        assert_eq!(*log.lock().expect("lock"), ["a"]);
        board.process_tick();
        assert_eq!(*log.lock().expect("lock"), ["a", "b", "c"]);
        assert_eq!(board.current_tick(), Tick(2));
    }

    #[test]
    fn zero_delay_tasks_scheduled_while_draining_run_same_tick() {
        let mut board = board();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&log);
        board.run_task_later(0, move |board| {
            board.run_task_later(0, move |board| {
                inner.lock().expect("lock").push(board.current_tick());
            });
        });
        board.process_tick();
        assert_eq!(*log.lock().expect("lock"), [Tick::ZERO]);
        assert_eq!(board.pending_tasks(), 0);
    }

    #[test]
    fn removed_entities_stop_resolving() {
        let mut board = board();
        let id = board.spawn(Entity::new(EntityKind::Prop, "crate"));
        let reference = board.entity_ref(id);
        assert!(reference.resolve(&board).is_some());
        board.remove_entity(id);
        assert!(reference.resolve(&board).is_none());
        assert!(!board.add_feature(reference, Arc::new(SimpleFeature::new(FeatureMeta::new("x")))));
    }

    #[test]
    fn sight_and_visibility_limit_can_see() {
        let mut board = board();
        let scout = board.spawn(
            Entity::new(EntityKind::Creature, "scout")
                .with_stats(StatBlock::new().with_base(names::SIGHT, 5.0)),
        );
        let near = board.spawn(Entity::new(EntityKind::Creature, "near").with_position(Vec3::new(3.0, 0.0, 0.0)));
        let far = board.spawn(Entity::new(EntityKind::Creature, "far").with_position(Vec3::new(9.0, 0.0, 0.0)));
        let lurker = board.spawn(Entity::new(EntityKind::Creature, "lurker").hidden());

        assert!(board.can_see(scout, near));
        assert!(!board.can_see(scout, far));
        assert!(!board.can_see(scout, lurker));
        assert!(board.can_see(far, scout), "no sight stat means unlimited");
    }

    #[test]
    fn equipping_lends_item_modifiers() {
        let mut board = board();
        let knight = board.spawn(
            Entity::new(EntityKind::Creature, "knight")
                .with_vitals(Vitals::Body(Body::humanoid(10.0)))
                .with_stats(StatBlock::new().with_base("armor", 1.0)),
        );
        let helm = board
            .give_item(
                knight,
                Item::new("helm").with_property(ItemProperty::Equipment {
                    slots: vec!["helmet".into()],
                    features: Vec::new(),
                }),
            )
            .expect("given");
        let sturdy = FeatureMeta::new("sturdy").with_modifier("armor", StatModifier::flat("helm", 2.0));
        board.add_feature(board.entity_ref(knight).item(helm), Arc::new(SimpleFeature::new(sturdy)));
        assert_eq!(board.stat_value(knight, "armor"), Some(1.0));

        assert!(!board.equip(knight, helm, "left_hand"));
        assert!(board.equip(knight, helm, "helmet"));
        assert_eq!(board.stat_value(knight, "armor"), Some(3.0));
        assert!(board.unequip(knight, helm));
        assert_eq!(board.stat_value(knight, "armor"), Some(1.0));
    }

    #[test]
    fn drain_collects_entity_journals() {
        let mut board = board();
        let id = board.spawn(Entity::new(EntityKind::Creature, "mage"));
        board.set_stat_base(id, "mana", 4.0);
        board.add_feature(board.entity_ref(id), Arc::new(SimpleFeature::new(FeatureMeta::new("focus"))));
        let changes = board.drain_changes();
        assert!(matches!(changes[0], ChangeEvent::EntityAdded { .. }));
        assert!(changes.iter().any(|e| matches!(e, ChangeEvent::Stat { .. })));
        assert!(changes.iter().any(|e| matches!(
            e,
            ChangeEvent::Feature { change: FeatureChange::Attached { feature }, .. } if feature == "focus"
        )));
        assert!(board.drain_changes().is_empty());
    }

    #[test]
    fn skill_tree_and_weapons_offer_skills() {
        use crate::combat::DamageType;
        use crate::skill::{AttackSkill, SkillMeta};

        let mut registry = ContentRegistry::new();
        registry.insert_skill(Arc::new(AttackSkill::new(SkillMeta::new("slash"), DamageType::Slash)));
        registry.insert_skill(Arc::new(AttackSkill::new(SkillMeta::new("bite"), DamageType::Pierce)));

        let mut board = board();
        let wolf = board.spawn(
            Entity::new(EntityKind::Creature, "wolf")
                .with_skill_tree_entry(SkillTreeEntry::new("jaws", "bite").unlocked())
                .with_skill_tree_entry(SkillTreeEntry::new("locked", "slash")),
        );
        board.give_item(
            wolf,
            Item::new("claw").with_property(ItemProperty::Weapon {
                skills: vec!["slash".into(), "missing".into()],
                damage_bonus: 0.0,
            }),
        );
        let offered: Vec<_> = board
            .available_skills(wolf, &registry)
            .into_iter()
            .map(|(skill, source)| (skill.id().to_string(), matches!(source, SkillSourceRef::Item(_))))
            .collect();
        assert_eq!(offered, [("bite".to_string(), false), ("slash".to_string(), true)]);
    }

    #[test]
    fn seeded_rolls_stay_in_range() {
        let mut board = board();
        assert!((0..100).map(|_| board.roll(6)).all(|r| (1..=6).contains(&r)));
        assert_eq!(board.roll(0), 0);
    }
}
