//! Resolved properties.

use dtlink_core::{
    identifier::Name,
    span::{Span, Spanned},
};
use dtlink_parser::ast::{AstId, PropertyDef, Value};

/// A named value holder inside one node.
///
/// Re-declaring a property replaces the active definition; the superseded
/// definitions are kept, oldest first, in [`Property::all_replaced`].
#[derive(Debug, Clone)]
pub struct Property {
    definition: PropertyDef,
    all_replaced: Vec<Property>,
}

impl Property {
    pub(crate) fn new(definition: PropertyDef) -> Self {
        Self {
            definition,
            all_replaced: Vec::new(),
        }
    }

    /// Take over the history of `previous` and append `previous` itself.
    pub(crate) fn supersede(&mut self, mut previous: Property) {
        self.all_replaced = std::mem::take(&mut previous.all_replaced);
        self.all_replaced.push(previous);
    }

    pub fn name(&self) -> Name {
        *self.definition.name.inner()
    }

    /// The AST statement that defined this property.
    pub fn definition(&self) -> &PropertyDef {
        &self.definition
    }

    pub fn id(&self) -> AstId {
        self.definition.id
    }

    pub fn span(&self) -> Span {
        self.definition.span
    }

    pub fn values(&self) -> &[Value] {
        &self.definition.values
    }

    /// Labels assigned on the defining statement.
    pub fn labels(&self) -> impl Iterator<Item = Spanned<Name>> + '_ {
        self.definition
            .labels
            .iter()
            .map(|label| Spanned::new(label.name, label.span))
    }

    /// Earlier definitions this one supersedes, oldest first.
    pub fn all_replaced(&self) -> &[Property] {
        &self.all_replaced
    }

    /// This definition followed by every replaced one, newest first.
    pub fn history(&self) -> impl Iterator<Item = &Property> {
        std::iter::once(self).chain(self.all_replaced.iter().rev())
    }

    pub fn first_cell(&self) -> Option<u64> {
        self.definition.first_cell()
    }
}
