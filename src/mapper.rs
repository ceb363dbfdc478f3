//! Mapping of formulas to networks of K-input lookup tables.
//!
//! # Pipeline
//!
//! [`LutMapper::map_formula`] builds one candidate diagram per order suggested by the
//! configured [`OrderHeuristic`], keeps the smallest quasi-reduced one and hands it to
//! [`LutMapper::map_qrbdd`], which repeatedly:
//!
//! 1. **Chooses a cut** `c`: the level whose estimated LUT cost is lowest. The `w` nodes at
//!    level `c` are addressed by a *select signal* of `ceil(log2(w))` bits.
//! 2. **Generates the select signal**: the path conditions of the cut nodes are one-hot;
//!    [`dense_pack`] turns them into select bit formulas over the variables above the cut,
//!    and each bit is mapped on its own, as a fresh formula, through the full pipeline.
//! 3. **Packs levels below the cut**: the select bits plus up to `K - bits` raw variables
//!    below the cut feed a layer of *transition* LUTs computing the densely packed index of
//!    the node reached at the end of the packed levels.
//! 4. **Terminates** when the packed levels reach the terminals: the last LUT computes the
//!    output itself.
//!
//! Otherwise the remainder is mapped according to the [`Strategy`]:
//!
//! - [`Strategy::LevelByLevel`] continues packing on the same diagram from the new select
//!   signal, without a new cut search.
//! - [`Strategy::FuseRecurse`] synthesizes a *fused* diagram whose top variables are the new
//!   select wires (MSB first) and whose subtrees are the original nodes at the end of the
//!   packed levels, then maps it from scratch (sifting and cut search included).
//!
//! # Termination
//!
//! A cut is admissible only if its select signal is narrower than `K` and its packing
//! step shrinks the remaining problem (the next select signal is narrower than the number
//! of levels it replaces). The last level always qualifies, so every recursion works on a
//! diagram with strictly fewer levels, and every select formula depends on strictly fewer
//! variables than the diagram it came from.
//!
//! # Wire names
//!
//! Fresh wires are named `{prefix}_int_{id}_b{bit}`, with `prefix` taken from the strategy
//! and `id` from a counter owned by the mapper, so names stay unique across all outputs
//! mapped by one [`LutMapper`].

use std::cmp::min;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::bdd::Bdd;
use crate::blif::BlifNetwork;
use crate::builder::{BddBuilder, BuilderKind};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::lut::Lut;
use crate::order::OrderHeuristic;
use crate::paths::{bits_for, dense_pack, path_conditions, select_prefix};
use crate::reduce::Reduction;
use crate::reference::Ref;
use crate::types::Level;

/// Smallest LUT size for which every cut search finds an admissible cut.
pub const MIN_LUT_SIZE: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Single cut, then rigid level-by-level packing down to the terminals.
    LevelByLevel,
    /// Fuse the packed select signal with the remaining levels and recurse.
    #[default]
    FuseRecurse,
}

impl Strategy {
    /// Prefix of generated wire names and dump files.
    pub fn prefix(self) -> &'static str {
        match self {
            Strategy::LevelByLevel => "basemap",
            Strategy::FuseRecurse => "fusemap",
        }
    }

    fn default_sift_limit(self) -> Option<usize> {
        match self {
            Strategy::LevelByLevel => None,
            Strategy::FuseRecurse => Some(16),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Number of LUT inputs (K).
    pub lut_size: usize,
    /// Sift every diagram before searching for a cut.
    pub sift: bool,
    /// Maximum number of variables sifted per diagram; `None` uses the strategy default
    /// (all variables for [`Strategy::LevelByLevel`], 16 for [`Strategy::FuseRecurse`]).
    pub sift_limit: Option<usize>,
    /// Stop trying further orders once the best diagram has fewer nodes than this.
    pub small_bdd_threshold: usize,
    /// Hard limit on the size of any diagram under construction.
    pub node_cutoff: Option<usize>,
    pub order: OrderHeuristic,
    pub builder: BuilderKind,
    /// Directory receiving a DOT dump of every diagram about to be cut.
    pub dump_dir: Option<PathBuf>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            lut_size: 5,
            sift: true,
            sift_limit: None,
            small_bdd_threshold: 10,
            node_cutoff: None,
            order: OrderHeuristic::default(),
            builder: BuilderKind::default(),
            dump_dir: None,
        }
    }
}

/// Per-run mapping context: configuration plus the wire and dump counters.
#[derive(Debug, Clone)]
pub struct LutMapper {
    strategy: Strategy,
    config: MapperConfig,
    signal_counter: usize,
    dump_counter: usize,
}

impl LutMapper {
    pub fn new(strategy: Strategy, config: MapperConfig) -> Self {
        if config.lut_size < MIN_LUT_SIZE {
            warn!("LUT size {} is too small, using {}", config.lut_size, MIN_LUT_SIZE);
        }
        Self {
            strategy,
            config,
            signal_counter: 0,
            dump_counter: 0,
        }
    }

    pub fn with_strategy(strategy: Strategy) -> Self {
        Self::new(strategy, MapperConfig::default())
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    fn lut_size(&self) -> usize {
        self.config.lut_size.max(MIN_LUT_SIZE)
    }

    /// Maps every output of `network`, in order, sharing this mapper's wire counter.
    pub fn map_network(&mut self, network: &BlifNetwork) -> Result<Vec<Lut>> {
        let total = network.outputs.len();
        let mut luts = Vec::new();
        for (i, (name, formula)) in network.outputs.iter().enumerate() {
            info!("[{}] Mapping output {} ({}/{})", self.strategy.prefix(), name, i + 1, total);
            luts.extend(self.map_formula(formula, name)?);
        }
        info!(
            "[{}] Mapping complete, created {} LUTs total",
            self.strategy.prefix(),
            luts.len()
        );
        Ok(luts)
    }

    /// Maps `formula` to LUTs whose last one drives `output`.
    pub fn map_formula(&mut self, formula: &Formula, output: &str) -> Result<Vec<Lut>> {
        let formula = formula.fold_constants();
        if let Some(value) = formula.as_const() {
            debug!("{} is constant {}", output, value);
            return Ok(vec![Lut::new(Vec::new(), output, Formula::from_bool(value))]);
        }
        let bdd = self.best_diagram(&formula, output)?;
        debug!("QRBDD for {} built ({} nodes), proceeding with mapping", output, bdd.size());
        self.map_qrbdd(bdd, output)
    }

    /// Tries every candidate order, keeps the diagram that was smallest as built, and
    /// returns it quasi-reduced.
    ///
    /// Once a diagram exists, later attempts are abandoned when they grow beyond twice its
    /// size.
    fn best_diagram(&self, formula: &Formula, output: &str) -> Result<Bdd> {
        let orders = self.candidate_orders(formula);
        let user_cutoff = self.config.node_cutoff.filter(|&c| c != 0);
        let mut best: Option<Bdd> = None;

        for (attempt, order) in orders.iter().enumerate() {
            let cutoff = match (user_cutoff, best.as_ref().map(|bdd| 2 * bdd.size())) {
                (Some(user), Some(escalated)) => Some(min(user, escalated)),
                (user, escalated) => user.or(escalated),
            };
            let builder = BddBuilder::new(self.config.builder).with_cutoff(cutoff);
            let bdd = match builder.build(formula, order) {
                Ok(bdd) => bdd,
                Err(Error::CutoffReached { limit }) => {
                    debug!("Attempt #{}: size cutoff of {} nodes reached", attempt, limit);
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!("Attempt #{}: order {:?} gives {} nodes", attempt, order, bdd.size());

            if best.as_ref().map_or(true, |b| bdd.size() < b.size()) {
                best = Some(bdd);
            }
            if best.as_ref().is_some_and(|b| b.size() < self.config.small_bdd_threshold) {
                break;
            }
        }

        let mut bdd = best.ok_or_else(|| Error::NoDiagram {
            output: output.to_string(),
        })?;
        if !bdd.is_level_synchronous() {
            bdd.make_level_synchronous();
        }
        bdd.reduce(Reduction::Quasi);
        Ok(bdd)
    }

    /// An explicit order is restricted to the variables of `formula`. Formulas it does not
    /// cover (such as select bits over generated wires) fall back to the mixed heuristics.
    fn candidate_orders(&self, formula: &Formula) -> Vec<Vec<String>> {
        let OrderHeuristic::Explicit(order) = &self.config.order else {
            return self.config.order.orders(formula);
        };
        let used: HashSet<String> = formula.variables().into_iter().collect();
        let restricted: Vec<String> = order.iter().filter(|v| used.contains(*v)).cloned().collect();
        if used.iter().all(|v| restricted.contains(v)) {
            vec![restricted]
        } else {
            OrderHeuristic::Mixed.orders(formula)
        }
    }

    /// Maps a diagram to LUTs whose last one drives `output`.
    ///
    /// The diagram is made level-synchronous and quasi-reduced first if it is not already.
    pub fn map_qrbdd(&mut self, mut bdd: Bdd, output: &str) -> Result<Vec<Lut>> {
        if !bdd.is_level_synchronous() {
            bdd.make_level_synchronous();
        }
        bdd.reduce(Reduction::Quasi);

        let n = bdd.num_vars();
        if n == 0 {
            let value = bdd.is_one(bdd.root());
            return Ok(vec![Lut::new(Vec::new(), output, Formula::from_bool(value))]);
        }

        if self.config.sift {
            let limit = self.config.sift_limit.or(self.strategy.default_sift_limit());
            let stats = bdd.sift(Level::new(0), limit);
            debug!(
                "Sifted {} variables: {} -> {} nodes",
                stats.variables_processed, stats.initial_size, stats.final_size
            );
        }
        self.dump(&bdd)?;

        let levels = bdd.nodes_by_level();
        let cut = self.find_cut(&levels);
        let root_conditions = path_conditions(&bdd, bdd.root(), Level::new(cut));
        let select_formulas: Vec<Formula> = levels[cut]
            .iter()
            .map(|r| root_conditions.get(r).cloned().unwrap_or_else(Formula::tt))
            .collect();
        let packed = dense_pack(&select_formulas);
        let select = self.gen_signal_ids(packed.len());
        debug!(
            "Best cut at level {} of {} (cost {:?}), {} nodes under the cut, {}-bit select signal",
            cut,
            n,
            self.score_cut(&levels, cut),
            levels[cut].len(),
            select.len()
        );

        let lower = self.map_from_level(&bdd, &levels, cut, &select, output)?;
        drop(bdd);

        let mut luts = Vec::new();
        for (formula, wire) in packed.iter().zip(&select) {
            luts.extend(self.map_formula(formula, wire)?);
        }
        luts.extend(lower);
        Ok(luts)
    }

    /// Packs the levels below `start`, driven by the select signal addressing the nodes at
    /// `start`, and maps everything below.
    fn map_from_level(
        &mut self,
        bdd: &Bdd,
        levels: &[Vec<Ref>],
        start: usize,
        select: &[String],
        output: &str,
    ) -> Result<Vec<Lut>> {
        let n = levels.len();
        let k = self.lut_size();
        let end = min(n, start + k.saturating_sub(select.len()));
        let pack: Vec<String> = (start..end)
            .map(|l| bdd.name(bdd.var_at(Level::new(l))).to_string())
            .collect();
        debug!("Packing variables [{}] into new LUT(s)", pack.join(", "));

        let targets: Vec<Ref> = if end == n { vec![Ref::ONE] } else { levels[end].clone() };
        let entry_conditions: Vec<BTreeMap<Ref, Formula>> = levels[start]
            .iter()
            .map(|&entry| path_conditions(bdd, entry, Level::new(end)))
            .collect();
        let mut target_formulas: Vec<Formula> = targets
            .iter()
            .map(|target| {
                Formula::disjunction(entry_conditions.iter().enumerate().map(|(i, conditions)| {
                    let reached = conditions.get(target).cloned().unwrap_or_else(Formula::ff);
                    Formula::mk_and(reached, select_prefix(select, i))
                }))
            })
            .collect();

        let inputs: Vec<String> = select.iter().cloned().chain(pack).collect();
        if end == n {
            let formula = target_formulas.pop().unwrap_or_else(Formula::ff);
            return Ok(vec![Lut::new(inputs, output, formula)]);
        }

        let packed = dense_pack(&target_formulas);
        let wires = self.gen_signal_ids(packed.len());
        let mut luts: Vec<Lut> = wires
            .iter()
            .zip(packed)
            .map(|(wire, formula)| Lut::new(inputs.clone(), wire.as_str(), formula))
            .collect();

        match self.strategy {
            Strategy::LevelByLevel if wires.len() < k => {
                luts.extend(self.map_from_level(bdd, levels, end, &wires, output)?);
            }
            strategy => {
                if strategy == Strategy::LevelByLevel {
                    debug!("Select signal at level {} is {} bits wide, fusing the remainder", end, wires.len());
                }
                let fused = fuse(bdd, levels, end, &wires);
                debug!("Fused diagram: {} levels, {} nodes", fused.num_vars(), fused.size());
                luts.extend(self.map_qrbdd(fused, output)?);
            }
        }
        Ok(luts)
    }

    /// Picks the admissible cut with the lowest estimated cost (the first one on ties).
    fn find_cut(&self, levels: &[Vec<Ref>]) -> usize {
        let n = levels.len();
        let k = self.lut_size();
        let mut best: Option<(usize, u64)> = None;

        for c in 0..n {
            let select = bits_for(levels[c].len());
            if select >= k {
                continue;
            }
            let end = min(n, c + k - select);
            if end < n && bits_for(levels[end].len()) >= end {
                // packing would not shrink the remaining diagram
                continue;
            }
            let score = self.score_cut(levels, c).unwrap_or(u64::MAX);
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((c, score));
            }
        }

        best.map_or(n.saturating_sub(1), |(c, _)| c)
    }

    /// Estimated number of LUTs for a cut at level `c`; `None` if the cut is infeasible.
    fn score_cut(&self, levels: &[Vec<Ref>], c: usize) -> Option<u64> {
        let n = levels.len() as u64;
        let k = self.lut_size() as u64;
        let select = bits_for(levels[c].len()) as u64;
        if select > k {
            return None;
        }

        let height_above = c as u64;
        let height_below = (n - height_above).saturating_sub(k - select);
        let upper = match self.strategy {
            Strategy::LevelByLevel => select * height_above.div_ceil(k),
            Strategy::FuseRecurse => select * height_above.div_ceil(k - 1),
        };
        if height_below == 0 {
            return Some(upper);
        }

        let out_multiplicity = bits_for(levels[(n - height_below) as usize].len()).max(1) as u64;
        if out_multiplicity >= k {
            return None;
        }
        let lower = match self.strategy {
            Strategy::LevelByLevel => height_below.div_ceil(k - out_multiplicity) * out_multiplicity,
            Strategy::FuseRecurse => (height_below + out_multiplicity).div_ceil(k - 1),
        };
        Some(upper + lower)
    }

    /// Fresh wire names for a signal of `width` bits, LSB first.
    fn gen_signal_ids(&mut self, width: usize) -> Vec<String> {
        self.signal_counter += 1;
        (0..width)
            .map(|bit| format!("{}_int_{}_b{}", self.strategy.prefix(), self.signal_counter, bit))
            .collect()
    }

    fn dump(&mut self, bdd: &Bdd) -> Result<()> {
        let Some(dir) = self.config.dump_dir.clone() else {
            return Ok(());
        };
        self.dump_counter += 1;
        let path = dir.join(format!("{}-input-{}.dot", self.strategy.prefix(), self.dump_counter));
        fs::write(&path, bdd.to_dot()?)?;
        debug!("Dumped diagram to {}", path.display());
        Ok(())
    }
}

/// Builds the diagram whose top levels are the `select` wires (MSB first) and whose
/// select-tree leaves are the nodes at level `end`, in index order, followed by copies of
/// the original levels `end..`. The result is quasi-reduced.
fn fuse(bdd: &Bdd, levels: &[Vec<Ref>], end: usize, select: &[String]) -> Bdd {
    let n = levels.len();
    let width = select.len();
    let names = select
        .iter()
        .rev()
        .cloned()
        .chain((end..n).map(|l| bdd.name(bdd.var_at(Level::new(l))).to_string()));
    let mut fused = Bdd::new(names);

    let mut remap: HashMap<Ref, Ref> = HashMap::from([(Ref::ZERO, Ref::ZERO), (Ref::ONE, Ref::ONE)]);
    for l in (end..n).rev() {
        let var = fused.var_at(Level::new(width + l - end));
        for &r in &levels[l] {
            let low = remap[&bdd.low(r)];
            let high = remap[&bdd.high(r)];
            let copy = fused.mk_node(var, low, high);
            remap.insert(r, copy);
        }
    }

    let targets: Vec<Ref> = levels[end].iter().map(|r| remap[r]).collect();
    let root = graft(&mut fused, 0, width, &targets);
    fused.set_root(root);
    fused.reduce(Reduction::Quasi);
    fused
}

/// Select tree below level `depth`: targets whose index has the current bit clear go to
/// the zero side. A target list that fits into one half is shared by both children.
fn graft(fused: &mut Bdd, depth: usize, width: usize, targets: &[Ref]) -> Ref {
    if depth == width {
        return targets.first().copied().unwrap_or(Ref::ZERO);
    }
    let var = fused.var_at(Level::new(depth));
    let half = 1usize << (width - depth - 1);
    if targets.len() <= half {
        let child = graft(fused, depth + 1, width, targets);
        fused.mk_node(var, child, child)
    } else {
        let low = graft(fused, depth + 1, width, &targets[..half]);
        let high = graft(fused, depth + 1, width, &targets[half..]);
        fused.mk_node(var, low, high)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::formula::tests::{assignments, random_formula};
    use crate::lut::{simulate, LutNetwork};
    use crate::parser::parse_formula;

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|s| s.to_string()).collect()
    }

    fn qrbdd(text: &str, order: &[&str]) -> (Formula, Bdd) {
        let f = parse_formula(text).unwrap();
        let mut bdd = BddBuilder::new(BuilderKind::QuasiReduced).build(&f, &names(order)).unwrap();
        bdd.reduce(Reduction::Quasi);
        (f, bdd)
    }

    fn assert_equivalent(f: &Formula, luts: &[Lut], vars: &[&str], output: &str) {
        let network = LutNetwork::new(luts).unwrap();
        for assignment in assignments(vars) {
            let wires = network.simulate(&assignment).unwrap();
            assert_eq!(wires[output], f.eval(&assignment).unwrap(), "{} under {:?}", f, assignment);
        }
    }

    #[test]
    fn test_constant_formula() {
        let mut mapper = LutMapper::with_strategy(Strategy::FuseRecurse);
        let f = parse_formula("(a <=> a) & true").unwrap();
        let luts = mapper.map_formula(&f, "out").unwrap();
        assert_eq!(luts.len(), 1);
        assert_eq!(luts[0].fan_in(), 0);
        assert_eq!(luts[0].formula().as_const(), Some(true));
    }

    #[test]
    fn test_small_formula_is_one_lut() {
        for strategy in [Strategy::LevelByLevel, Strategy::FuseRecurse] {
            let mut mapper = LutMapper::with_strategy(strategy);
            let f = parse_formula("(a & b) | (c <=> d)").unwrap();
            let luts = mapper.map_formula(&f, "out").unwrap();
            assert_eq!(luts.len(), 1, "{:?}", strategy);
            assert_eq!(luts[0].output(), "out");
            assert_equivalent(&f, &luts, &["a", "b", "c", "d"], "out");
        }
    }

    #[test]
    fn test_wide_formula_respects_lut_size() {
        let vars = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let f = parse_formula("(a & b) | (c & d) | (e ^ f) | (g & (h <=> i))").unwrap();
        for strategy in [Strategy::LevelByLevel, Strategy::FuseRecurse] {
            for lut_size in [3, 4, 5] {
                let config = MapperConfig {
                    lut_size,
                    ..MapperConfig::default()
                };
                let mut mapper = LutMapper::new(strategy, config);
                let luts = mapper.map_formula(&f, "out").unwrap();
                assert!(luts.len() > 1);
                assert!(luts.iter().all(|l| l.fan_in() <= lut_size), "{:?}/{}", strategy, lut_size);
                assert_eq!(luts.last().map(|l| l.output()), Some("out"));
                assert_equivalent(&f, &luts, &vars, "out");
            }
        }
    }

    #[test]
    fn test_random_formulas_without_sifting() {
        let vars = ["a", "b", "c", "d", "e", "f", "g"];
        let mut rng = StdRng::seed_from_u64(17);
        for strategy in [Strategy::LevelByLevel, Strategy::FuseRecurse] {
            let config = MapperConfig {
                sift: false,
                order: OrderHeuristic::None,
                ..MapperConfig::default()
            };
            let mut mapper = LutMapper::new(strategy, config);
            for _ in 0..30 {
                let f = random_formula(&mut rng, &vars, 7);
                let luts = mapper.map_formula(&f, "out").unwrap();
                assert!(luts.iter().all(|l| l.fan_in() <= 5));
                let luts_ref = &luts;
                for assignment in assignments(&vars) {
                    let wires = simulate(luts_ref, &assignment).unwrap();
                    assert_eq!(wires["out"], f.eval(&assignment).unwrap(), "{:?}: {}", strategy, f);
                }
            }
        }
    }

    #[test]
    fn test_wire_names_are_unique() {
        let vars = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let f = parse_formula("(a ^ b ^ c ^ d) & (e | f | (g ^ h))").unwrap();
        let mut mapper = LutMapper::with_strategy(Strategy::FuseRecurse);
        let mut luts = mapper.map_formula(&f, "x").unwrap();
        luts.extend(mapper.map_formula(&f, "y").unwrap());
        let mut outputs: Vec<&str> = luts.iter().map(|l| l.output()).collect();
        let count = outputs.len();
        outputs.sort();
        outputs.dedup();
        assert_eq!(outputs.len(), count);
        assert!(outputs.iter().all(|o| *o == "x" || *o == "y" || o.starts_with("fusemap_int_")));
        let network = LutNetwork::new(&luts).unwrap();
        for assignment in assignments(&vars) {
            let wires = network.simulate(&assignment).unwrap();
            assert_eq!(wires["x"], wires["y"]);
        }
    }

    #[test]
    fn test_score_cut() {
        // 4 levels with widths 1, 2, 4, 2
        let levels: Vec<Vec<Ref>> = [1usize, 2, 4, 2]
            .iter()
            .map(|&w| (0..w).map(|i| Ref::new(2 + i as u32)).collect())
            .collect();
        let base = LutMapper::with_strategy(Strategy::LevelByLevel);
        let fuse = LutMapper::with_strategy(Strategy::FuseRecurse);
        // everything fits below the top cut
        assert_eq!(base.score_cut(&levels, 0), Some(0));
        assert_eq!(fuse.score_cut(&levels, 0), Some(0));
        // select width 2 over two levels
        assert_eq!(base.score_cut(&levels, 2), Some(2));
        assert_eq!(fuse.score_cut(&levels, 2), Some(2));
        assert_eq!(base.find_cut(&levels), 0);
    }

    #[test]
    fn test_find_cut_requires_progress() {
        // K = 3: a 2-bit select at level 2 leaves 2 + 2 levels, no better than 4
        let levels: Vec<Vec<Ref>> = [1usize, 2, 4, 2, 2, 2]
            .iter()
            .map(|&w| (0..w).map(|i| Ref::new(2 + i as u32)).collect())
            .collect();
        let config = MapperConfig {
            lut_size: 3,
            ..MapperConfig::default()
        };
        let mapper = LutMapper::new(Strategy::FuseRecurse, config);
        let cut = mapper.find_cut(&levels);
        let select = bits_for(levels[cut].len());
        let end = min(levels.len(), cut + 3 - select);
        assert!(end == levels.len() || bits_for(levels[end].len()) < end);
    }

    #[test]
    fn test_fuse_preserves_function() {
        let vars = ["a", "b", "c", "d", "e"];
        let (f, bdd) = qrbdd("(a ^ b) & (c | d) | (a & e)", &vars);
        let levels = bdd.nodes_by_level();
        let end = 2;
        let select: Vec<String> = (0..bits_for(levels[end].len())).map(|b| format!("s{}", b)).collect();
        let fused = fuse(&bdd, &levels, end, &select);
        assert!(fused.is_level_synchronous());
        assert_eq!(fused.num_vars(), select.len() + vars.len() - end);

        let conditions = path_conditions(&bdd, bdd.root(), Level::new(end));
        for mut assignment in assignments(&vars) {
            let index = levels[end]
                .iter()
                .position(|r| conditions[r].eval(&assignment).unwrap())
                .unwrap();
            for (bit, wire) in select.iter().enumerate() {
                assignment.insert(wire.clone(), index >> bit & 1 == 1);
            }
            assert_eq!(fused.evaluate(&assignment).unwrap(), f.eval(&assignment).unwrap());
        }
    }

    #[test]
    fn test_graft_shares_small_halves() {
        let mut bdd = Bdd::new(["s1", "s0", "x"]);
        let x = bdd.var_at(Level::new(2));
        let t0 = bdd.mk_node(x, Ref::ZERO, Ref::ONE);
        let t1 = bdd.mk_node(x, Ref::ONE, Ref::ZERO);
        let t2 = bdd.mk_node(x, Ref::ONE, Ref::ONE);
        let root = graft(&mut bdd, 0, 2, &[t0, t1, t2]);
        // the one side holds a single target, shared by both values of s0
        let high = bdd.high(root);
        assert_eq!(bdd.low(high), t2);
        assert_eq!(bdd.high(high), t2);
        let low = bdd.low(root);
        assert_eq!((bdd.low(low), bdd.high(low)), (t0, t1));
    }

    #[test]
    fn test_explicit_order_applies_to_covered_formulas() {
        let config = MapperConfig {
            order: OrderHeuristic::Explicit(names(&["z", "c", "b", "a"])),
            ..MapperConfig::default()
        };
        let mapper = LutMapper::new(Strategy::FuseRecurse, config);
        let f = parse_formula("a & b | c").unwrap();
        assert_eq!(mapper.candidate_orders(&f), vec![names(&["c", "b", "a"])]);
        let g = parse_formula("fusemap_int_1_b0 | a").unwrap();
        assert_eq!(mapper.candidate_orders(&g), OrderHeuristic::Mixed.orders(&g));
    }

    #[test]
    fn test_cutoff_everywhere_is_an_error() {
        let config = MapperConfig {
            node_cutoff: Some(3),
            ..MapperConfig::default()
        };
        let mut mapper = LutMapper::new(Strategy::FuseRecurse, config);
        let f = parse_formula("a & b").unwrap();
        assert!(matches!(mapper.map_formula(&f, "o"), Err(Error::NoDiagram { .. })));
    }

    #[test]
    fn test_map_qrbdd_accepts_fully_reduced_input() {
        let f = parse_formula("a & c | b & !c").unwrap();
        let bdd = BddBuilder::new(BuilderKind::FullyReduced)
            .build(&f, &names(&["a", "b", "c"]))
            .unwrap();
        let mut mapper = LutMapper::with_strategy(Strategy::LevelByLevel);
        let luts = mapper.map_qrbdd(bdd, "o").unwrap();
        assert_equivalent(&f, &luts, &["a", "b", "c"], "o");
    }

    #[test]
    fn test_empty_diagram() {
        let mut bdd = Bdd::default();
        bdd.set_root(Ref::ONE);
        let mut mapper = LutMapper::with_strategy(Strategy::FuseRecurse);
        let luts = mapper.map_qrbdd(bdd, "o").unwrap();
        assert_eq!(luts.len(), 1);
        assert_eq!(luts[0].formula().as_const(), Some(true));
    }
}
