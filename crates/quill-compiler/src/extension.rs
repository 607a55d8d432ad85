//! Extension bundles.

use crate::function::TemplateFunction;
use crate::operator::Operator;
use crate::tag::Tag;
use crate::visitor::VisitorFactory;

/// A bundle of operators, tags, functions and passes added to an
/// environment. Every hook defaults to contributing nothing.
pub trait Extension {
    fn name(&self) -> &'static str;

    fn binary_operators(&self) -> Vec<Operator> {
        Vec::new()
    }

    fn prefix_operators(&self) -> Vec<Operator> {
        Vec::new()
    }

    fn postfix_operators(&self) -> Vec<Operator> {
        Vec::new()
    }

    fn conditional_operator(&self) -> Option<Operator> {
        None
    }

    fn tags(&self) -> Vec<Box<dyn Tag>> {
        Vec::new()
    }

    fn functions(&self) -> Vec<TemplateFunction> {
        Vec::new()
    }

    fn node_visitors(&self) -> Vec<VisitorFactory> {
        Vec::new()
    }
}
