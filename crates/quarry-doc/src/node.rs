use bson::{Bson, Document};

/// Structural view of a BSON value.
///
/// The flattener only cares about three shapes: a mapping it can descend
/// into by key, a sequence it can descend into by index, and everything
/// else. `Node::of` does the classification once so the traversal code can
/// match on shape instead of on the twenty-odd BSON element types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    /// Any non-container value, `Null` included.
    Scalar(&'a Bson),
    Sequence(&'a [Bson]),
    Mapping(&'a Document),
}

impl<'a> Node<'a> {
    pub fn of(value: &'a Bson) -> Self {
        match value {
            Bson::Document(doc) => Node::Mapping(doc),
            Bson::Array(items) => Node::Sequence(items),
            other => Node::Scalar(other),
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Node::Scalar(_))
    }
}
