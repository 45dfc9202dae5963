//! Delta engine implementation.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use super::engine_config::{DeltaConfig, MatchingStrategy};
use super::engine_matching::{greedy_assignment, optimal_assignment, ScoredPair};
use super::filter::ObjectFilter;
use super::fingerprint::fingerprints;
use crate::command::{AlterProperty, Command, DeltaRoot};
use crate::compile::map_qualified_names;
use crate::context::DiffContext;
use crate::error::Result;
use crate::matching::string_similarity::normalize_expression;
use crate::matching::{ComparisonContext, FieldComparator, ObjectComparator};
use crate::model::{
    resolve_inherited_fields, FieldValue, Name, ObjectId, ObjectKind, PropertyValue, Schema, SchemaObject,
    DELTA_ORDER,
};
use crate::ordering::{linearize, sort, SortNode, SortOptions};

/// Computes command trees between schema snapshots.
pub struct DeltaEngine {
    config: DeltaConfig,
    comparator: Box<dyn ObjectComparator>,
    filter: ObjectFilter,
}

impl DeltaEngine {
    /// Create a new engine with default settings
    pub fn new() -> Self {
        Self {
            config: DeltaConfig::default(),
            comparator: Box::new(FieldComparator::new()),
            filter: ObjectFilter::default(),
        }
    }

    /// Replace the thresholds and matching strategy.
    #[must_use]
    pub fn with_config(mut self, config: DeltaConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the similarity function.
    #[must_use]
    pub fn with_comparator(mut self, comparator: Box<dyn ObjectComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Restrict which objects take part in the diff.
    #[must_use]
    pub fn with_filter(mut self, filter: ObjectFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DeltaConfig {
        &self.config
    }

    #[must_use]
    pub fn comparator_name(&self) -> &'static str {
        self.comparator.name()
    }

    /// Delta between two whole snapshots.
    ///
    /// Every kind in [`DELTA_ORDER`] is diffed over its top-level objects;
    /// renames decided for one kind are visible to the kinds after it.
    pub fn delta_schemas(&self, old: &Schema, new: &Schema, ctx: &mut DiffContext) -> Result<DeltaRoot> {
        let mut commands = Vec::new();
        for &kind in DELTA_ORDER {
            if !self.filter.accepts_kind(kind) {
                continue;
            }
            let old_set: Vec<&SchemaObject> = old.top_level(kind).filter(|o| self.filter.accepts(o)).collect();
            let new_set: Vec<&SchemaObject> = new.top_level(kind).filter(|o| self.filter.accepts(o)).collect();
            let delta = self.delta_objects(&old_set, &new_set, kind, ctx, old, new)?;
            debug!(
                kind = %kind,
                old = old_set.len(),
                new = new_set.len(),
                commands = delta.len(),
                "Computed kind delta"
            );
            commands.extend(delta.commands);
        }

        let root = if self.config.linearize {
            linearize(commands, old, new)?
        } else {
            DeltaRoot::from_commands(commands)
        };
        info!(summary = %root.summary(), "Schema delta computed");
        Ok(root)
    }

    /// Delta for one kind between two object sets.
    pub fn delta_objects(
        &self,
        old_set: &[&SchemaObject],
        new_set: &[&SchemaObject],
        kind: ObjectKind,
        ctx: &mut DiffContext,
        old: &Schema,
        new: &Schema,
    ) -> Result<DeltaRoot> {
        let cmp = ComparisonContext::from_session(ctx);
        let mut run = DeltaRun {
            engine: self,
            old,
            new,
            ctx,
            cmp,
            inherited: HashMap::new(),
        };
        let commands = run.delta_set(old_set, new_set, kind, &Scope::top_level())?;
        debug!(memo_hits = run.cmp.memo_hits(), "Comparison memo");
        Ok(DeltaRoot::from_commands(commands))
    }
}

impl Default for DeltaEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// One delta run
// ============================================================================

/// Where a sibling set sits in the tree.
struct Scope {
    parent_confidence: f64,
    /// Old and new name of the owner, for owned children.
    owner: Option<(Name, Name)>,
}

impl Scope {
    const fn top_level() -> Self {
        Self {
            parent_confidence: 1.0,
            owner: None,
        }
    }

    /// Name an old object has once its owner's command has run.
    fn current_name(&self, old_name: &Name) -> Name {
        self.owner
            .as_ref()
            .and_then(|(old_owner, new_owner)| old_name.rebase(old_owner, new_owner))
            .unwrap_or_else(|| old_name.clone())
    }
}

struct DeltaRun<'a> {
    engine: &'a DeltaEngine,
    old: &'a Schema,
    new: &'a Schema,
    ctx: &'a mut DiffContext,
    cmp: ComparisonContext,
    /// Effective inherited fields of the new snapshot, per kind.
    inherited: HashMap<ObjectKind, IndexMap<ObjectId, BTreeMap<String, FieldValue>>>,
}

impl<'a> DeltaRun<'a> {
    fn delta_set(
        &mut self,
        old_items: &[&'a SchemaObject],
        new_items: &[&'a SchemaObject],
        kind: ObjectKind,
        scope: &Scope,
    ) -> Result<Vec<Command>> {
        if kind == ObjectKind::Module {
            return self.delta_modules(old_items, new_items);
        }

        let (old_rest, new_rest) = self.drop_unchanged(old_items, new_items)?;
        if old_rest.is_empty() && new_rest.is_empty() {
            return Ok(Vec::new());
        }

        let scored = self.score_pairs(&old_rest, &new_rest, kind);
        let mut accepted: Vec<ScoredPair> = scored
            .iter()
            .copied()
            .filter(|p| p.forced || p.is_unchanged() || self.engine.config.is_alter(p.similarity))
            .collect();
        let by_priority = |a: &ScoredPair, b: &ScoredPair| {
            b.forced
                .cmp(&a.forced)
                .then_with(|| (1.0 - a.similarity).total_cmp(&(1.0 - b.similarity)))
                .then_with(|| new_rest[a.new].name.cmp(&new_rest[b.new].name))
                .then_with(|| old_rest[a.old].name.cmp(&old_rest[b.old].name))
        };
        accepted.sort_by(by_priority);

        let mut assignment = match self.engine.config.strategy {
            MatchingStrategy::Greedy => greedy_assignment(&accepted),
            MatchingStrategy::Optimal => optimal_assignment(&accepted, old_rest.len(), new_rest.len())?,
        };
        assignment.sort_by(by_priority);

        let claimed_old: HashSet<usize> = assignment.iter().map(|p| p.old).collect();
        let claimed_new: HashSet<usize> = assignment.iter().map(|p| p.new).collect();

        // Siblings may reference each other, so every rename in this set is
        // known before any alter compares fields.
        for pair in assignment.iter().filter(|p| !p.is_unchanged()) {
            let (y, x) = (old_rest[pair.old], new_rest[pair.new]);
            if scope.current_name(&y.name) != x.name {
                self.ctx.record_rename(y.name.clone(), x.name.clone());
                self.cmp.record_rename(y.name.clone(), x.name.clone());
            }
        }

        let mut alters = Vec::new();
        for pair in assignment.iter().filter(|p| !p.is_unchanged()) {
            let (y, x) = (old_rest[pair.old], new_rest[pair.new]);
            if let Some(cmd) = self.alter_command(y, x, pair, scope)? {
                alters.push((x, y, cmd));
            }
        }

        let mut creates = Vec::new();
        for (ni, x) in new_rest.iter().enumerate() {
            if claimed_new.contains(&ni) {
                continue;
            }
            if self.ctx.guidance.creation_banned(kind, &x.name) {
                warn!(kind = %kind, name = %x.name, "Creation is banned but no alter could replace it");
                continue;
            }
            let best = best_claimed(&scored, |p| p.new == ni && claimed_old.contains(&p.old));
            let confidence = scope.parent_confidence.min(1.0 - best);
            creates.push((*x, self.create_command(x, confidence)?));
        }

        let mut deletes = Vec::new();
        for (oi, y) in old_rest.iter().enumerate() {
            if claimed_old.contains(&oi) {
                continue;
            }
            let current = scope.current_name(&y.name);
            if self.deletion_banned(kind, &y.name, &current) {
                warn!(kind = %kind, name = %y.name, "Deletion is banned but no alter could replace it");
                continue;
            }
            let best = best_claimed(&scored, |p| p.old == oi && claimed_new.contains(&p.new));
            let confidence = scope.parent_confidence.min(1.0 - best);
            deletes.push((*y, self.delete_command(y, current, confidence)));
        }

        let mut commands = Vec::with_capacity(creates.len() + alters.len() + deletes.len());
        if kind.is_inheriting() {
            commands.extend(self.order_creates(creates)?);
            commands.extend(self.order_alters(alters)?);
            commands.extend(self.order_deletes(deletes)?);
        } else {
            commands.extend(creates.into_iter().map(|(_, cmd)| cmd));
            commands.extend(alters.into_iter().map(|(_, _, cmd)| cmd));
            commands.extend(deletes.into_iter().map(|(_, cmd)| cmd));
        }
        Ok(commands)
    }

    /// Remove pairs whose fingerprints match: they are unchanged.
    fn drop_unchanged(
        &self,
        old_items: &[&'a SchemaObject],
        new_items: &[&'a SchemaObject],
    ) -> Result<(Vec<&'a SchemaObject>, Vec<&'a SchemaObject>)> {
        let threshold = self.engine.config.parallel_threshold;
        let old_fps = fingerprints(self.old, old_items, threshold)?;
        let new_fps = fingerprints(self.new, new_items, threshold)?;

        let mut pool: HashMap<u64, Vec<usize>> = HashMap::with_capacity(old_fps.len());
        for (i, fp) in old_fps.iter().enumerate().rev() {
            pool.entry(*fp).or_default().push(i);
        }

        let mut unchanged_old = vec![false; old_items.len()];
        let mut new_rest = Vec::new();
        for (x, fp) in new_items.iter().zip(&new_fps) {
            match pool.get_mut(fp).and_then(Vec::pop) {
                Some(oi) => unchanged_old[oi] = true,
                None => new_rest.push(*x),
            }
        }
        let old_rest = old_items
            .iter()
            .zip(unchanged_old)
            .filter(|(_, unchanged)| !unchanged)
            .map(|(y, _)| *y)
            .collect();
        Ok((old_rest, new_rest))
    }

    /// Similarity of every (new, old) pair, with guidance applied.
    fn score_pairs(
        &mut self,
        old_rest: &[&'a SchemaObject],
        new_rest: &[&'a SchemaObject],
        kind: ObjectKind,
    ) -> Vec<ScoredPair> {
        let mut pairs = Vec::with_capacity(old_rest.len() * new_rest.len());
        for (ni, x) in new_rest.iter().enumerate() {
            let creation_banned = self.ctx.guidance.creation_banned(kind, &x.name);
            for (oi, y) in old_rest.iter().enumerate() {
                let mapped = self.cmp.map_name(&y.name);
                let guidance = &self.ctx.guidance;
                if guidance.alter_banned(kind, &y.name, &x.name) || guidance.alter_banned(kind, &mapped, &x.name) {
                    pairs.push(ScoredPair {
                        old: oi,
                        new: ni,
                        similarity: 0.0,
                        forced: false,
                    });
                    continue;
                }
                let deletion_banned = self.deletion_banned(kind, &y.name, &mapped);
                let session_rename = self.ctx.renamed_to(&y.name) == Some(&x.name);

                let similarity = self
                    .engine
                    .comparator
                    .compare(y, x, self.old, self.new, &mut self.cmp)
                    .clamp(0.0, 1.0);
                let must_alter = similarity > 0.0 && (creation_banned || deletion_banned);
                pairs.push(ScoredPair {
                    old: oi,
                    new: ni,
                    similarity,
                    forced: session_rename || must_alter,
                });
            }
        }
        pairs
    }

    fn deletion_banned(&self, kind: ObjectKind, old_name: &Name, current: &Name) -> bool {
        let guidance = &self.ctx.guidance;
        guidance.deletion_banned(kind, old_name) || guidance.deletion_banned(kind, current)
    }

    // ========================================================================
    // Command construction
    // ========================================================================

    fn alter_command(
        &mut self,
        y: &'a SchemaObject,
        x: &'a SchemaObject,
        pair: &ScoredPair,
        scope: &Scope,
    ) -> Result<Option<Command>> {
        let current = scope.current_name(&y.name);
        let renamed = current != x.name;

        let confidence = if pair.forced || !renamed {
            1.0
        } else {
            pair.similarity
        };
        let confidence = confidence.min(scope.parent_confidence);

        let mut cmd = if renamed {
            Command::rename(x.kind, current, x.name.clone())
        } else {
            Command::alter(x.kind, current)
        }
        .with_confidence(confidence);
        cmd.properties = self.changed_properties(y, x)?;

        let child_scope = Scope {
            parent_confidence: confidence,
            owner: Some((y.name.clone(), x.name.clone())),
        };
        for refdict in x.kind.descriptor().refdicts {
            for &child_kind in refdict.kinds {
                let old_children: Vec<&SchemaObject> = self
                    .old
                    .children_in(y.id, refdict.attr)
                    .into_iter()
                    .filter(|c| c.kind == child_kind)
                    .collect();
                let new_children: Vec<&SchemaObject> = self
                    .new
                    .children_in(x.id, refdict.attr)
                    .into_iter()
                    .filter(|c| c.kind == child_kind)
                    .collect();
                let sub = self.delta_set(&old_children, &new_children, child_kind, &child_scope)?;
                cmd.subcommands.extend(sub);
            }
        }

        if !renamed && cmd.properties.is_empty() && cmd.subcommands.is_empty() {
            return Ok(None);
        }
        Ok(Some(cmd))
    }

    /// Explicit fields whose value differs once pending renames are applied.
    fn changed_properties(&self, y: &SchemaObject, x: &SchemaObject) -> Result<Vec<AlterProperty>> {
        let old_fields = self.old.reduced_fields(y)?;
        let new_fields = self.new.reduced_fields(x)?;
        let desc = x.kind.descriptor();

        let rank = |name: &str| desc.fields.iter().position(|f| f.name == name).unwrap_or(usize::MAX);
        let mut names: Vec<&String> = old_fields.keys().chain(new_fields.keys()).collect();
        names.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
        names.dedup();

        let mut changed = Vec::new();
        for name in names {
            let (before, after) = (old_fields.get(name), new_fields.get(name));
            if self.equivalent(before, after) {
                continue;
            }
            let computed = desc.field(name).is_some_and(|f| f.computed);
            changed.push(AlterProperty::change(name.clone(), before.cloned(), after.cloned()).computed(computed));
        }
        Ok(changed)
    }

    fn equivalent(&self, before: Option<&PropertyValue>, after: Option<&PropertyValue>) -> bool {
        match (before, after) {
            (None, None) => true,
            (Some(PropertyValue::Expr(a)), Some(PropertyValue::Expr(b))) => {
                normalize_expression(&map_qualified_names(a, |n| self.cmp.map_name(n))) == normalize_expression(b)
            }
            (Some(a), Some(b)) => &a.map_names(|n| self.cmp.map_name(n)) == b,
            _ => false,
        }
    }

    fn create_command(&mut self, x: &SchemaObject, confidence: f64) -> Result<Command> {
        let mut cmd = Command::create(x.kind, x.name.clone()).with_confidence(confidence);
        cmd.properties.push(AlterProperty::set("id", PropertyValue::Id(x.id)));

        let desc = x.kind.descriptor();
        let explicit = self.new.reduced_fields(x)?;
        for (name, value) in &explicit {
            let computed = desc.field(name).is_some_and(|f| f.computed);
            cmd.properties.push(AlterProperty::set(name.clone(), value.clone()).computed(computed));
        }

        if x.kind.is_inheriting() {
            let effective = self.inherited_fields(x.kind)?.get(&x.id).cloned().unwrap_or_default();
            for (name, value) in effective {
                if explicit.contains_key(&name) {
                    continue;
                }
                let value = self.new.reduce(&value)?;
                cmd.properties.push(AlterProperty::set(name, value).inherited(true));
            }
        }

        for refdict in desc.refdicts {
            for child in self.new.children_in(x.id, refdict.attr) {
                let sub = self.create_command(child, confidence)?;
                cmd.subcommands.push(sub);
            }
        }
        Ok(cmd)
    }

    fn inherited_fields(&mut self, kind: ObjectKind) -> Result<&IndexMap<ObjectId, BTreeMap<String, FieldValue>>> {
        if !self.inherited.contains_key(&kind) {
            let resolved = resolve_inherited_fields(self.new, kind)?;
            self.inherited.insert(kind, resolved);
        }
        Ok(&self.inherited[&kind])
    }

    /// A drop of `y` and, nested, of everything it owns, deepest first.
    fn delete_command(&self, y: &SchemaObject, current: Name, confidence: f64) -> Command {
        let mut cmd = Command::delete(y.kind, current.clone()).with_confidence(confidence);
        for child in self.old.children(y.id).into_iter().rev() {
            let child_current = child.name.rebase(&y.name, &current).unwrap_or_else(|| child.name.clone());
            cmd.subcommands.push(self.delete_command(child, child_current, confidence));
        }
        cmd
    }

    fn delta_modules(&mut self, old_items: &[&'a SchemaObject], new_items: &[&'a SchemaObject]) -> Result<Vec<Command>> {
        let old_names: HashSet<&Name> = old_items.iter().map(|m| &m.name).collect();
        let new_names: HashSet<&Name> = new_items.iter().map(|m| &m.name).collect();

        let mut commands = Vec::new();
        for module in new_items.iter().filter(|m| !old_names.contains(&m.name)) {
            if self.ctx.guidance.creation_banned(ObjectKind::Module, &module.name) {
                warn!(name = %module.name, "Module creation is banned");
                continue;
            }
            commands.push(self.create_command(module, 1.0)?);
        }
        for module in old_items.iter().filter(|m| !new_names.contains(&m.name)) {
            if self.ctx.guidance.deletion_banned(ObjectKind::Module, &module.name) {
                warn!(name = %module.name, "Module deletion is banned");
                continue;
            }
            commands.push(Command::delete(ObjectKind::Module, module.name.clone()));
        }
        Ok(commands)
    }

    // ========================================================================
    // Inheritance-respecting emission order
    // ========================================================================

    fn order_creates(&self, creates: Vec<(&SchemaObject, Command)>) -> Result<Vec<Command>> {
        let graph = creates
            .into_iter()
            .map(|(x, cmd)| {
                let bases = self.new.get_bases(x.id).into_iter().map(|b| b.name.clone());
                (x.name.clone(), SortNode::new(cmd).with_deps(bases))
            })
            .collect();
        sort(graph, SortOptions::allow_unresolved())
    }

    fn order_alters(&self, alters: Vec<(&SchemaObject, &SchemaObject, Command)>) -> Result<Vec<Command>> {
        let graph = alters
            .into_iter()
            .map(|(x, y, cmd)| {
                let new_bases = self.new.get_bases(x.id).into_iter().map(|b| b.name.clone());
                let old_bases = self.old.get_bases(y.id).into_iter().map(|b| self.cmp.map_name(&b.name));
                let deps: Vec<Name> = new_bases.chain(old_bases).collect();
                (x.name.clone(), SortNode::new(cmd).with_deps(deps))
            })
            .collect();
        sort(graph, SortOptions::allow_unresolved())
    }

    fn order_deletes(&self, deletes: Vec<(&SchemaObject, Command)>) -> Result<Vec<Command>> {
        let graph = deletes
            .into_iter()
            .map(|(y, cmd)| {
                let bases = self.old.get_bases(y.id).into_iter().map(|b| b.name.clone());
                (y.name.clone(), SortNode::new(cmd).with_deps(bases))
            })
            .collect();
        let mut ordered = sort(graph, SortOptions::allow_unresolved())?;
        ordered.reverse();
        Ok(ordered)
    }
}

/// Highest nonzero similarity among `pairs` matching `filter`; 0.0 if none.
fn best_claimed(pairs: &[ScoredPair], filter: impl Fn(&ScoredPair) -> bool) -> f64 {
    pairs
        .iter()
        .filter(|p| filter(p))
        .map(|p| p.similarity)
        .fold(0.0, f64::max)
}
