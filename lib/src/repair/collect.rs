//! Group exception table entries into decompiled `try` blocks
//!
//! Entries are grouped by the handler they dispatch to first, then by the start of the range
//! they protect. Looking up by handler first is what lets a `finally` entry (whose range starts
//! at its own handler) join the group of the regular handler registered before it, while the
//! lookup by start merges catch clauses of the same `try` that dispatch to different handlers.

use super::{Error, MalformedReason};
use crate::jvm::code::{Code, ExceptionHandler, SynLabel};
use std::collections::HashMap;

/// Index of a [`DecompiledTry`] inside [`TryDescriptors`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorId(usize);

/// One `try` block as recovered from the exception table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecompiledTry {
    /// Start label of the first range that created this block
    pub try_start: SynLabel,

    /// Handler labels dispatched to from this block (no duplicates, first-seen order)
    pub handler_starts: Vec<SynLabel>,

    /// Index in the exception table of the `finally` entry, if there is one
    pub default_handler: Option<usize>,
}

impl DecompiledTry {
    fn new(try_start: SynLabel) -> DecompiledTry {
        DecompiledTry {
            try_start,
            handler_starts: vec![],
            default_handler: None,
        }
    }

    fn add_handler(&mut self, handler: SynLabel) {
        if !self.handler_starts.contains(&handler) {
            self.handler_starts.push(handler);
        }
    }
}

/// All of the `try` blocks of a method, keyed by region start and by handler start
///
/// Both maps store ids into one arena of descriptors, so a descriptor reachable from several
/// labels is still a single value.
#[derive(Clone, Debug, Default)]
pub struct TryDescriptors {
    descriptors: Vec<DecompiledTry>,
    by_start: HashMap<SynLabel, DescriptorId>,
    by_handler: HashMap<SynLabel, DescriptorId>,

    /// Keys of `by_start`, in the order the table first mentions them
    start_order: Vec<SynLabel>,
}

impl TryDescriptors {
    /// Group the entries of an exception table
    ///
    /// Fails if a `finally` entry comes before any regular entry for its handler, or if a group
    /// ends up with two `finally` entries.
    pub fn collect(table: &[ExceptionHandler]) -> Result<TryDescriptors, Error> {
        let mut result = TryDescriptors::default();

        for (idx, entry) in table.iter().enumerate() {
            let malformed = |reason| Error::MalformedExceptionTable { entry: idx, reason };

            if entry.is_default_handler() {
                let id = result
                    .by_handler
                    .get(&entry.handler)
                    .copied()
                    .ok_or_else(|| malformed(MalformedReason::DefaultHandlerWithoutRegularHandler))?;
                let descriptor = &mut result.descriptors[id.0];
                if descriptor.default_handler.is_some() {
                    return Err(malformed(MalformedReason::DuplicateDefaultHandler));
                }
                descriptor.default_handler = Some(idx);
                descriptor.add_handler(entry.handler);
                continue;
            }

            let id = match result.by_handler.get(&entry.handler) {
                Some(id) => *id,
                None => result.lookup_or_create(entry.start),
            };
            result.by_handler.entry(entry.handler).or_insert(id);
            if !result.by_start.contains_key(&entry.start) {
                result.by_start.insert(entry.start, id);
                result.start_order.push(entry.start);
            }
            result.descriptors[id.0].add_handler(entry.handler);
        }

        Ok(result)
    }

    fn lookup_or_create(&mut self, start: SynLabel) -> DescriptorId {
        if let Some(id) = self.by_start.get(&start) {
            return *id;
        }
        let id = DescriptorId(self.descriptors.len());
        self.descriptors.push(DecompiledTry::new(start));
        id
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[DecompiledTry] {
        &self.descriptors
    }

    pub fn get(&self, id: DescriptorId) -> &DecompiledTry {
        &self.descriptors[id.0]
    }

    pub fn by_start(&self, start: SynLabel) -> Option<&DecompiledTry> {
        self.by_start.get(&start).map(|id| &self.descriptors[id.0])
    }

    pub fn by_handler(&self, handler: SynLabel) -> Option<&DecompiledTry> {
        self.by_handler.get(&handler).map(|id| &self.descriptors[id.0])
    }

    /// Region starts, in table order, along with the descriptor each one belongs to
    pub fn region_starts(&self) -> impl Iterator<Item = (SynLabel, DescriptorId)> + '_ {
        self.start_order
            .iter()
            .map(move |start| (*start, self.by_start[start]))
    }

    /// Region start labels keyed to a descriptor
    pub fn starts_of(&self, id: DescriptorId) -> Vec<SynLabel> {
        self.start_order
            .iter()
            .copied()
            .filter(|start| self.by_start[start] == id)
            .collect()
    }

    /// Handler starts across all descriptors (may repeat across descriptors)
    pub fn handler_starts(&self) -> impl Iterator<Item = SynLabel> + '_ {
        self.descriptors
            .iter()
            .flat_map(|descriptor| descriptor.handler_starts.iter().copied())
    }
}

/// Check that every exception table label is placed and that no range is inverted
pub fn validate_exception_table(code: &Code) -> Result<(), Error> {
    let layout = code.instructions.label_layout();
    for (idx, entry) in code.exception_table.iter().enumerate() {
        let position = |label: SynLabel| {
            layout
                .get(&label)
                .copied()
                .ok_or(Error::MissingLabelTarget(label))
        };
        let start = position(entry.start)?;
        let end = position(entry.end)?;
        position(entry.handler)?;
        if end <= start {
            return Err(Error::MalformedExceptionTable {
                entry: idx,
                reason: MalformedReason::EndNotAfterStart,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{LabelGenerator, SynLabelGenerator};
    use crate::jvm::BinaryName;
    use std::collections::BTreeSet;

    fn entry(
        start: SynLabel,
        end: SynLabel,
        handler: SynLabel,
        catch_type: Option<BinaryName>,
    ) -> ExceptionHandler {
        ExceptionHandler {
            start,
            end,
            handler,
            catch_type,
        }
    }

    fn labels<const N: usize>() -> [SynLabel; N] {
        let mut generator = SynLabelGenerator::default();
        [(); N].map(|_| generator.fresh_label())
    }

    /// Descriptors as `(region starts, handler starts)` pairs, independent of order
    fn groups(descriptors: &TryDescriptors) -> BTreeSet<(BTreeSet<SynLabel>, BTreeSet<SynLabel>)> {
        (0..descriptors.descriptors().len())
            .map(DescriptorId)
            .map(|id| {
                (
                    descriptors.starts_of(id).into_iter().collect(),
                    descriptors.get(id).handler_starts.iter().copied().collect(),
                )
            })
            .collect()
    }

    #[test]
    fn single_entry() {
        let [l1, l2, l3] = labels();
        let table = [entry(l1, l2, l3, Some(BinaryName::EXCEPTION))];
        let descriptors = TryDescriptors::collect(&table).unwrap();

        assert_eq!(
            descriptors.descriptors(),
            &[DecompiledTry {
                try_start: l1,
                handler_starts: vec![l3],
                default_handler: None,
            }]
        );
        assert_eq!(descriptors.by_start(l1), descriptors.by_handler(l3));
        assert_eq!(descriptors.by_start(l3), None);
    }

    // Two catch clauses for the same `try` end up in one descriptor
    #[test]
    fn shared_start_different_handlers() {
        let [l1, l2, l3, l4] = labels();
        let table = [
            entry(l1, l2, l3, Some(BinaryName::EXCEPTION)),
            entry(l1, l2, l4, Some(BinaryName::THROWABLE)),
        ];
        let descriptors = TryDescriptors::collect(&table).unwrap();

        assert_eq!(descriptors.descriptors().len(), 1);
        assert_eq!(descriptors.descriptors()[0].handler_starts, vec![l3, l4]);
        assert_eq!(descriptors.region_starts().count(), 1);
    }

    // A range split in two (eg. around a nested `finally`) with one handler is one descriptor,
    // but both starts are still region starts
    #[test]
    fn shared_handler_different_starts() {
        let [l1, l2, l3, l4, l5] = labels();
        let table = [entry(l1, l2, l5, None), entry(l3, l4, l5, None)];
        let descriptors = TryDescriptors::collect(&table).unwrap();

        assert_eq!(descriptors.descriptors().len(), 1);
        assert_eq!(
            descriptors.region_starts().map(|(start, _)| start).collect::<Vec<_>>(),
            vec![l1, l3]
        );
        assert_eq!(descriptors.handler_starts().collect::<Vec<_>>(), vec![l5]);
    }

    #[test]
    fn default_handler_joins_regular_handler() {
        let [l1, l2, l3, l4] = labels();
        let table = [
            entry(l1, l2, l3, Some(BinaryName::EXCEPTION)),
            entry(l3, l4, l3, None),
        ];
        let descriptors = TryDescriptors::collect(&table).unwrap();

        assert_eq!(
            descriptors.descriptors(),
            &[DecompiledTry {
                try_start: l1,
                handler_starts: vec![l3],
                default_handler: Some(1),
            }]
        );
        assert_eq!(
            descriptors.by_start(l3),
            None,
            "start of a default entry is not a region start"
        );
    }

    #[test]
    fn default_handler_first_is_malformed() {
        let [l1, l2, l3, l4] = labels();
        let table = [entry(l3, l4, l3, None), entry(l1, l2, l3, None)];
        match TryDescriptors::collect(&table) {
            Err(Error::MalformedExceptionTable { entry, reason }) => {
                assert_eq!(entry, 0);
                assert_eq!(reason, MalformedReason::DefaultHandlerWithoutRegularHandler);
            }
            other => panic!("expected malformed table, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_default_handler_is_malformed() {
        let [l1, l2, l3, l4] = labels();
        let table = [
            entry(l1, l2, l3, None),
            entry(l3, l4, l3, None),
            entry(l3, l4, l3, None),
        ];
        match TryDescriptors::collect(&table) {
            Err(Error::MalformedExceptionTable { entry, reason }) => {
                assert_eq!(entry, 2);
                assert_eq!(reason, MalformedReason::DuplicateDefaultHandler);
            }
            other => panic!("expected malformed table, got {:?}", other),
        }
    }

    // Reordering entries (keeping default entries after their regular entry) doesn't change the
    // grouping
    #[test]
    fn grouping_ignores_entry_order() {
        let [a1, a2, ah1, ah2, b1, b2, bh, c1, c2, ch] = labels();
        let table = vec![
            entry(a1, a2, ah1, Some(BinaryName::EXCEPTION)),
            entry(a1, a2, ah2, Some(BinaryName::THROWABLE)),
            entry(b1, b2, bh, None),
            entry(c1, c2, ch, None),
            entry(ch, b2, ch, None),
        ];
        let expected = groups(&TryDescriptors::collect(&table).unwrap());

        let permutations: [[usize; 5]; 5] = [
            [4, 3, 2, 1, 0],
            [2, 3, 4, 0, 1],
            [1, 0, 3, 4, 2],
            [3, 2, 1, 4, 0],
            [0, 3, 1, 2, 4],
        ];
        for permutation in permutations {
            let permuted: Vec<ExceptionHandler> =
                permutation.iter().map(|idx| table[*idx].clone()).collect();
            let default_pos = permutation.iter().position(|idx| *idx == 4);
            let regular_pos = permutation.iter().position(|idx| *idx == 3);
            if default_pos < regular_pos {
                continue;
            }
            assert_eq!(
                groups(&TryDescriptors::collect(&permuted).unwrap()),
                expected,
                "Different grouping for permutation {:?}",
                permutation
            );
        }
    }
}
