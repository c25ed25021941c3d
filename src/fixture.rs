/*!
An in-memory [Model]/[Symbol] implementation, for tests and the demo binary only.

The real configuration-model front-end (parser, symbol table, `.config` I/O) is out of scope for
this crate (§6); this fixture exists purely so the rest of the crate has something to build
constraints against without one.
*/

use std::collections::HashMap;

use crate::model::{
    Model, ModelExpr, Property, Symbol, SymbolId, SymbolType, SymbolValue, Tristate,
};

/// One symbol's static shape plus its current value, as built by [FixtureModel].
#[derive(Clone)]
pub struct FixtureSymbol {
    id: SymbolId,
    name: String,
    symbol_type: SymbolType,
    value: SymbolValue,
    direct_dep: Option<ModelExpr>,
    properties: Vec<Property>,
    choice_members: Vec<SymbolId>,
    known_values: Vec<String>,
}

impl Symbol for FixtureSymbol {
    fn id(&self) -> SymbolId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn symbol_type(&self) -> SymbolType {
        self.symbol_type
    }

    fn current_value(&self) -> SymbolValue {
        self.value.clone()
    }

    fn direct_dep(&self) -> Option<ModelExpr> {
        self.direct_dep.clone()
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn choice_members(&self) -> &[SymbolId] {
        &self.choice_members
    }

    fn known_values(&self) -> &[String] {
        &self.known_values
    }
}

/// A small, mutable, in-memory model — a scratch symbol table with a fluent builder API.
#[derive(Default)]
pub struct FixtureModel {
    symbols: Vec<FixtureSymbol>,
    by_name: HashMap<String, SymbolId>,
}

impl FixtureModel {
    pub fn new() -> Self {
        FixtureModel::default()
    }

    fn push(&mut self, name: &str, symbol_type: SymbolType, value: SymbolValue) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(FixtureSymbol {
            id,
            name: name.to_string(),
            symbol_type,
            value,
            direct_dep: None,
            properties: Vec::new(),
            choice_members: Vec::new(),
            known_values: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn add_bool(&mut self, name: &str) -> SymbolId {
        self.push(name, SymbolType::Bool, SymbolValue::Tri(Tristate::No))
    }

    pub fn add_tri(&mut self, name: &str) -> SymbolId {
        self.push(name, SymbolType::Tri, SymbolValue::Tri(Tristate::No))
    }

    pub fn add_int(&mut self, name: &str) -> SymbolId {
        self.push(name, SymbolType::Int, SymbolValue::NonBool(None))
    }

    pub fn add_hex(&mut self, name: &str) -> SymbolId {
        self.push(name, SymbolType::Hex, SymbolValue::NonBool(None))
    }

    pub fn add_str(&mut self, name: &str) -> SymbolId {
        self.push(name, SymbolType::Str, SymbolValue::NonBool(None))
    }

    /// Declares a choice group with the given member symbol ids (already added).
    pub fn add_choice(&mut self, name: &str, members: &[SymbolId]) -> SymbolId {
        let id = self.push(name, SymbolType::Choice, SymbolValue::Tri(Tristate::No));
        self.symbols[id.0 as usize].choice_members = members.to_vec();
        id
    }

    pub fn set_direct_dep(&mut self, id: SymbolId, dep: ModelExpr) {
        self.symbols[id.0 as usize].direct_dep = Some(dep);
    }

    pub fn add_property(&mut self, id: SymbolId, prop: Property) {
        self.symbols[id.0 as usize].properties.push(prop);
    }

    /// Declares `value` as a known value of a non-boolean symbol, in addition to any values
    /// already reachable through a `Property::Default`.
    pub fn declare_value(&mut self, id: SymbolId, value: impl Into<String>) {
        let values = &mut self.symbols[id.0 as usize].known_values;
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn set_current(&mut self, id: SymbolId, value: SymbolValue) {
        self.symbols[id.0 as usize].value = value;
    }
}

impl Model for FixtureModel {
    type Sym = FixtureSymbol;

    fn symbols(&self) -> &[FixtureSymbol] {
        &self.symbols
    }

    fn symbol(&self, id: SymbolId) -> &FixtureSymbol {
        &self.symbols[id.0 as usize]
    }

    fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    fn set_value(&mut self, id: SymbolId, value: SymbolValue) -> bool {
        match (&self.symbols[id.0 as usize].symbol_type, &value) {
            (SymbolType::Bool, SymbolValue::Tri(Tristate::Mod)) => false,
            _ => {
                self.symbols[id.0 as usize].value = value;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_symbols_by_name() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        assert_eq!(model.resolve("A"), Some(a));
        assert_eq!(model.resolve("nope"), None);
    }

    #[test]
    fn set_value_rejects_mod_on_plain_bool() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        assert!(!model.set_value(a, SymbolValue::Tri(Tristate::Mod)));
        assert!(model.set_value(a, SymbolValue::Tri(Tristate::Yes)));
    }
}
