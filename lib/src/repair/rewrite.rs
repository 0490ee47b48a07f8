use crate::jvm::code::{ExceptionHandler, SynLabel};
use std::collections::HashMap;

/// Point exception table entries at their new region starts
///
/// Only `start` ever changes, and only for entries whose start was moved. Entry count, order,
/// ends, handlers, and catch types are all preserved.
pub fn rewrite_exception_table(
    table: &[ExceptionHandler],
    new_starts: &HashMap<SynLabel, SynLabel>,
) -> Vec<ExceptionHandler> {
    table
        .iter()
        .map(|entry| ExceptionHandler {
            start: new_starts.get(&entry.start).copied().unwrap_or(entry.start),
            ..entry.clone()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{LabelGenerator, SynLabelGenerator};
    use crate::jvm::BinaryName;

    #[test]
    fn only_mapped_starts_change() {
        let mut labels = SynLabelGenerator::default();
        let [l1, l2, l3, l4, l5, fresh] = [(); 6].map(|_| labels.fresh_label());

        let table = vec![
            ExceptionHandler {
                start: l1,
                end: l2,
                handler: l3,
                catch_type: Some(BinaryName::EXCEPTION),
            },
            ExceptionHandler {
                start: l3,
                end: l4,
                handler: l3,
                catch_type: None,
            },
            ExceptionHandler {
                start: l1,
                end: l2,
                handler: l5,
                catch_type: Some(BinaryName::THROWABLE),
            },
        ];
        let new_starts: HashMap<SynLabel, SynLabel> = [(l1, fresh)].into_iter().collect();

        let rewritten = rewrite_exception_table(&table, &new_starts);
        assert_eq!(rewritten.len(), table.len());
        for (old, new) in table.iter().zip(&rewritten) {
            assert_eq!(new.end, old.end);
            assert_eq!(new.handler, old.handler);
            assert_eq!(new.catch_type, old.catch_type);
        }
        assert_eq!(
            rewritten.iter().map(|e| e.start).collect::<Vec<_>>(),
            vec![fresh, l3, fresh]
        );
    }

    #[test]
    fn empty_mapping_is_identity() {
        let mut labels = SynLabelGenerator::default();
        let [l1, l2, l3] = [(); 3].map(|_| labels.fresh_label());
        let table = vec![ExceptionHandler {
            start: l1,
            end: l2,
            handler: l3,
            catch_type: None,
        }];
        assert_eq!(rewrite_exception_table(&table, &HashMap::new()), table);
    }
}
