/*!
The feature literal store (FLS, §4.1): allocation and interning of propositional literals for
every symbol value of interest, and the literal ↔ solver-variable map (`satmap`).

Mirrors the shape of the teacher's atom/literal split, but collapses "atom database" and
"literal database" into one append-only store — this crate has no watch lists or trail to keep
in sync with it.
*/

use std::collections::HashMap;

use log::trace;

use crate::model::{SymbolId, SymbolType};

/// A solver-visible propositional variable, numbered from 1 (DIMACS convention).
pub type SatVar = u32;

/// A signed reference to a [SatVar]: positive or negated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SatLit {
    var: SatVar,
    polarity: bool,
}

impl SatLit {
    pub fn positive(var: SatVar) -> Self {
        SatLit { var, polarity: true }
    }

    pub fn negative(var: SatVar) -> Self {
        SatLit { var, polarity: false }
    }

    pub fn var(self) -> SatVar {
        self.var
    }

    pub fn polarity(self) -> bool {
        self.polarity
    }

    pub fn negate(self) -> SatLit {
        SatLit { var: self.var, polarity: !self.polarity }
    }

    /// Signed-integer (DIMACS) form.
    pub fn to_dimacs(self) -> i64 {
        if self.polarity {
            self.var as i64
        } else {
            -(self.var as i64)
        }
    }
}

impl std::fmt::Display for SatLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.polarity {
            write!(f, "{}", self.var)
        } else {
            write!(f, "-{}", self.var)
        }
    }
}

/// The tristate role a SYMBOL literal plays, per §3's feature-literal definition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolRole {
    /// "evaluates to yes".
    Y,
    /// "evaluates to yes or mod" (tristate only).
    Both,
}

/// The tag of a feature literal, carrying its tag-specific payload (§3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LiteralTag {
    Symbol(SymbolId, SymbolRole),
    /// "no prompt condition" helper literal for a symbol (§4.4 rule 5).
    Npc(SymbolId),
    True,
    False,
    /// A value literal for a non-boolean symbol; `None` is the synthetic "unset" value.
    NonBool(SymbolId, Option<String>),
    /// Choice-membership helper literal.
    Choice(SymbolId),
    /// "reached via select" helper literal.
    Select(SymbolId),
    /// Auxiliary Tseitin literal; carries no symbol identity.
    TmpSat,
}

/// A feature literal (`fexpr`): a named propositional atom with a tag and a solver variable.
#[derive(Clone, Debug)]
pub struct FeatureLiteral {
    satvar: SatVar,
    name: String,
    tag: LiteralTag,
}

impl FeatureLiteral {
    pub fn satvar(&self) -> SatVar {
        self.satvar
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &LiteralTag {
        &self.tag
    }

    /// The positive [SatLit] for this literal.
    pub fn lit(&self) -> SatLit {
        SatLit::positive(self.satvar)
    }
}

/// Allocates and interns feature literals; owns the `satvar → fexpr` map.
///
/// `satmap` is append-only: literals are never removed once minted, matching the session
/// lifetime described in §3 ("literals and constants... live until session end").
pub struct LiteralStore {
    satmap: Vec<FeatureLiteral>,
    symbol_y: HashMap<SymbolId, SatVar>,
    symbol_both: HashMap<SymbolId, SatVar>,
    symbol_npc: HashMap<SymbolId, SatVar>,
    symbol_select: HashMap<SymbolId, SatVar>,
    symbol_choice: HashMap<SymbolId, SatVar>,
    nonbool_values: HashMap<SymbolId, Vec<SatVar>>,
    nonbool_index: HashMap<(SymbolId, Option<String>), SatVar>,
    truth: Option<SatVar>,
    falsity: Option<SatVar>,
}

impl LiteralStore {
    pub fn new() -> Self {
        LiteralStore {
            satmap: Vec::new(),
            symbol_y: HashMap::new(),
            symbol_both: HashMap::new(),
            symbol_npc: HashMap::new(),
            symbol_select: HashMap::new(),
            symbol_choice: HashMap::new(),
            nonbool_values: HashMap::new(),
            nonbool_index: HashMap::new(),
            truth: None,
            falsity: None,
        }
    }

    /// Allocates a fresh literal with the next `satvar`, interns it, and returns its variable.
    ///
    /// This is the FLS's only allocator; every other `get_or_*` helper bottoms out here.
    pub fn mint(&mut self, tag: LiteralTag, name: impl Into<String>) -> SatVar {
        let satvar = (self.satmap.len() + 1) as SatVar;
        let name = name.into();
        trace!("minting literal {satvar} ({name}) tag={tag:?}");
        self.satmap.push(FeatureLiteral { satvar, name, tag });
        satvar
    }

    pub fn literal(&self, var: SatVar) -> Option<&FeatureLiteral> {
        self.satmap.get(var.checked_sub(1)? as usize)
    }

    pub fn len(&self) -> usize {
        self.satmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satmap.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureLiteral> {
        self.satmap.iter()
    }

    /// Mints the `TRUE` and `FALSE` constants; must be called exactly once, before any other
    /// literal is minted, so their unit clauses are the first clauses emitted (§4.1).
    pub fn create_constants(&mut self) -> (SatVar, SatVar) {
        assert!(self.truth.is_none(), "constants already created");
        let t = self.mint(LiteralTag::True, "TRUE");
        let f = self.mint(LiteralTag::False, "FALSE");
        self.truth = Some(t);
        self.falsity = Some(f);
        (t, f)
    }

    pub fn truth(&self) -> SatVar {
        self.truth.expect("constants not yet created")
    }

    pub fn falsity(&self) -> SatVar {
        self.falsity.expect("constants not yet created")
    }

    /// Returns (or mints, in declaration order) the literals for a symbol's tristate role(s)
    /// per §4.1: one literal (`y`) for BOOL, two (`y`, `both`) for TRI.
    pub fn symbol_literals(&mut self, id: SymbolId, name: &str, ty: SymbolType) -> Vec<SatVar> {
        let y = self.symbol_y(id, name);
        match ty {
            SymbolType::Bool | SymbolType::Choice => vec![y],
            _ => {
                let both = self.symbol_both(id, name);
                vec![y, both]
            }
        }
    }

    pub fn symbol_y(&mut self, id: SymbolId, name: &str) -> SatVar {
        if let Some(v) = self.symbol_y.get(&id) {
            return *v;
        }
        let v = self.mint(LiteralTag::Symbol(id, SymbolRole::Y), format!("{name}=y"));
        self.symbol_y.insert(id, v);
        v
    }

    pub fn symbol_both(&mut self, id: SymbolId, name: &str) -> SatVar {
        if let Some(v) = self.symbol_both.get(&id) {
            return *v;
        }
        let v = self.mint(LiteralTag::Symbol(id, SymbolRole::Both), format!("{name}=both"));
        self.symbol_both.insert(id, v);
        v
    }

    pub fn symbol_y_opt(&self, id: SymbolId) -> Option<SatVar> {
        self.symbol_y.get(&id).copied()
    }

    pub fn symbol_both_opt(&self, id: SymbolId) -> Option<SatVar> {
        self.symbol_both.get(&id).copied()
    }

    pub fn npc(&mut self, id: SymbolId, name: &str) -> SatVar {
        if let Some(v) = self.symbol_npc.get(&id) {
            return *v;
        }
        let v = self.mint(LiteralTag::Npc(id), format!("{name}=NPC"));
        self.symbol_npc.insert(id, v);
        v
    }

    pub fn select_helper(&mut self, id: SymbolId, name: &str) -> SatVar {
        if let Some(v) = self.symbol_select.get(&id) {
            return *v;
        }
        let v = self.mint(LiteralTag::Select(id), format!("{name}=SELECT"));
        self.symbol_select.insert(id, v);
        v
    }

    pub fn choice_helper(&mut self, id: SymbolId, name: &str) -> SatVar {
        if let Some(v) = self.symbol_choice.get(&id) {
            return *v;
        }
        let v = self.mint(LiteralTag::Choice(id), format!("{name}=CHOICE"));
        self.symbol_choice.insert(id, v);
        v
    }

    /// Returns the existing literal for `value` on `id`, or `None` (§4.1 `lookup_value`).
    pub fn lookup_value(&self, id: SymbolId, value: Option<&str>) -> Option<SatVar> {
        self.nonbool_index
            .get(&(id, value.map(str::to_owned)))
            .copied()
    }

    /// Idempotently mints (if needed) the literal for `value` on `id`. Per §9's open-question
    /// resolution, a freshly minted value literal is fully exclusivity-constrained against its
    /// siblings in the same call, before the caller builds any comparator OR over it; the
    /// actual clause emission is done by the constraint builder, which calls this then
    /// `nonbool_values` to see every sibling minted so far. Returns `(satvar, is_fresh)`.
    pub fn get_or_create_value(
        &mut self,
        id: SymbolId,
        name: &str,
        value: Option<&str>,
    ) -> (SatVar, bool) {
        if let Some(v) = self.lookup_value(id, value) {
            return (v, false);
        }
        let label = match value {
            Some(v) => format!("{name}={v}"),
            None => format!("{name}=<unset>"),
        };
        let v = self.mint(LiteralTag::NonBool(id, value.map(str::to_owned)), label);
        self.nonbool_index.insert((id, value.map(str::to_owned)), v);
        self.nonbool_values.entry(id).or_default().push(v);
        (v, true)
    }

    /// All value literals minted so far for `id`, in minting order, "unset" first if present.
    pub fn known_value_literals(&self, id: SymbolId) -> &[SatVar] {
        self.nonbool_values.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for LiteralStore {
    fn default() -> Self {
        Self::new()
    }
}
