//! Which stored objects reference which.
//!
//! Each stored object records the labels its bytes point at. When an
//! object is rewritten with a different reference set, or deleted, targets
//! that lose their last referrer are released, recursively.

use std::collections::BTreeMap;

use super::allocator::Label;
use super::bytes::{ByteConverter, ByteReader, ConvertError, ObjectBytes};

/// Reference graph between stored objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRelationTree {
    children: BTreeMap<Label, Vec<Label>>,
    referrers: BTreeMap<Label, usize>,
}

impl ObjectRelationTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the references held by `label`.
    ///
    /// Returns every label that became unreferenced as a result, including
    /// labels reachable only through them.
    pub fn update(&mut self, label: Label, references: &[Label]) -> Vec<Label> {
        for &child in references {
            *self.referrers.entry(child).or_insert(0) += 1;
        }
        let old = if references.is_empty() {
            self.children.remove(&label)
        } else {
            self.children.insert(label, references.to_vec())
        };

        let mut released = Vec::new();
        for child in old.unwrap_or_default() {
            self.drop_reference(child, &mut released);
        }
        released
    }

    /// Forget `label` entirely, returning the labels it kept alive.
    pub fn remove(&mut self, label: Label) -> Vec<Label> {
        self.referrers.remove(&label);
        let mut released = Vec::new();
        for child in self.children.remove(&label).unwrap_or_default() {
            self.drop_reference(child, &mut released);
        }
        released
    }

    /// Number of objects pointing at `label`.
    #[must_use]
    pub fn referrer_count(&self, label: Label) -> usize {
        self.referrers.get(&label).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn references_of(&self, label: Label) -> &[Label] {
        self.children.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    fn drop_reference(&mut self, label: Label, released: &mut Vec<Label>) {
        let mut stack = vec![label];
        while let Some(current) = stack.pop() {
            let Some(count) = self.referrers.get_mut(&current) else {
                continue;
            };
            *count -= 1;
            if *count > 0 {
                continue;
            }
            self.referrers.remove(&current);
            released.push(current);
            stack.extend(self.children.remove(&current).unwrap_or_default());
        }
    }
}

/// Persisted as the `(label, references)` list; referrer counts are
/// rebuilt on load.
impl ByteConverter for ObjectRelationTree {
    fn write_down(&self, out: &mut ObjectBytes) {
        let pairs: Vec<(Label, Vec<Label>)> = self
            .children
            .iter()
            .map(|(label, refs)| (*label, refs.clone()))
            .collect();
        pairs.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let pairs: Vec<(Label, Vec<Label>)> = Vec::read_out(reader)?;
        let mut tree = Self::new();
        for (label, refs) in pairs {
            for &child in &refs {
                *tree.referrers.entry(child).or_insert(0) += 1;
            }
            tree.children.insert(label, refs);
        }
        Ok(tree)
    }
}
