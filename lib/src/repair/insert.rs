//! Insert stack save/restore markers around region and handler starts
//!
//! For every region start:
//!
//! ```text,ignore,no_run
//!     start:                  start:
//!         nop                     @save_stack_before_try
//!                      =>     new_start:
//!                                 nop
//!                                 @restore_stack_in_handler
//! ```
//!
//! and for every handler start:
//!
//! ```text,ignore,no_run
//!     handler:                handler:
//!         astore 1     =>         astore 1
//!                                 @restore_stack_in_handler
//! ```
//!
//! Insertion happens in two phases. Planning finds and checks every insertion point without
//! touching the stream, so a method with one bad region is left exactly as it was. Applying the
//! plan only links new nodes next to nodes found during planning.

use super::{Error, ExpectedShape, MalformedReason, TryDescriptors};
use crate::jvm::code::{ExceptionHandler, InstructionStream, Node, NodeId, PseudoInsn, SynLabel};
use std::collections::{HashMap, HashSet};

/// Checked insertion points for one method
#[derive(Debug, Default)]
pub struct MarkerPlan {
    /// Region start labels and the `nop` they lead to
    regions: Vec<(SynLabel, NodeId)>,

    /// Handler start labels and the `astore` they lead to
    handlers: Vec<(SynLabel, NodeId)>,
}

/// What applying a plan did to the stream
#[derive(Debug, Default)]
pub struct InsertedMarkers {
    /// Fresh start label for every original region start
    pub new_starts: HashMap<SynLabel, SynLabel>,

    pub save_markers: usize,
    pub region_restore_markers: usize,
    pub handler_restore_markers: usize,
}

impl MarkerPlan {
    /// Locate and check every insertion point
    ///
    /// Each region start and each handler start is visited once, however many entries refer to
    /// it. Distinct labels placed right next to each other share one marker, since they denote
    /// the same position.
    ///
    /// A rewritten start sits right before the region's `nop`, so an entry whose end label falls
    /// between its start and that `nop` would end up with its end before its start. Such an entry
    /// protects no instructions and is rejected here.
    pub fn new(
        descriptors: &TryDescriptors,
        exception_table: &[ExceptionHandler],
        stream: &InstructionStream,
    ) -> Result<MarkerPlan, Error> {
        let mut plan = MarkerPlan::default();

        let mut visited_starts: HashSet<SynLabel> = HashSet::new();
        let mut region_nodes: HashMap<NodeId, SynLabel> = HashMap::new();
        for (start, _) in descriptors.region_starts() {
            if !visited_starts.insert(start) {
                continue;
            }
            let node = expect_first_real(stream, start, ExpectedShape::RegionEntry)?;
            if let Some(first) = region_nodes.get(&node) {
                log::trace!("Region start {:?} shares its entry with {:?}", start, first);
            } else {
                region_nodes.insert(node, start);
            }
            plan.regions.push((start, node));
        }

        let region_entries: HashMap<SynLabel, NodeId> = plan.regions.iter().copied().collect();
        for (entry, handler) in exception_table.iter().enumerate() {
            if let Some(nop) = region_entries.get(&handler.start) {
                if ends_before_entry(stream, handler, *nop) {
                    return Err(Error::MalformedExceptionTable {
                        entry,
                        reason: MalformedReason::EmptyRange,
                    });
                }
            }
        }

        let mut visited_handlers: HashSet<SynLabel> = HashSet::new();
        let mut handler_nodes: HashSet<NodeId> = HashSet::new();
        for handler in descriptors.handler_starts() {
            if !visited_handlers.insert(handler) {
                continue;
            }
            let node = expect_first_real(stream, handler, ExpectedShape::ExceptionCapture)?;
            if handler_nodes.insert(node) {
                plan.handlers.push((handler, node));
            }
        }

        Ok(plan)
    }

    /// Insert the markers
    pub fn apply(self, stream: &mut InstructionStream) -> Result<InsertedMarkers, Error> {
        let mut inserted = InsertedMarkers::default();

        let mut entered: HashMap<NodeId, SynLabel> = HashMap::new();
        for (start, nop) in self.regions {
            if let Some(new_start) = entered.get(&nop) {
                inserted.new_starts.insert(start, *new_start);
                continue;
            }
            let new_start = stream.fresh_label();
            stream.insert_before(nop, PseudoInsn::SaveStackBeforeTry)?;
            stream.insert_before(nop, Node::Label(new_start))?;
            stream.insert_after(nop, PseudoInsn::RestoreStackInHandler)?;
            log::trace!("Region {:?} now starts at {:?}", start, new_start);

            entered.insert(nop, new_start);
            inserted.new_starts.insert(start, new_start);
            inserted.save_markers += 1;
            inserted.region_restore_markers += 1;
        }

        for (handler, store) in self.handlers {
            stream.insert_after(store, PseudoInsn::RestoreStackInHandler)?;
            log::trace!("Restoring stack in handler {:?}", handler);
            inserted.handler_restore_markers += 1;
        }

        Ok(inserted)
    }
}

/// Whether the entry's end label is placed between its start label and the region's `nop`
fn ends_before_entry(stream: &InstructionStream, handler: &ExceptionHandler, nop: NodeId) -> bool {
    let mut cursor = stream.label_position(handler.start);
    while let Some(id) = cursor {
        if id == nop {
            return false;
        }
        if stream.get(id).and_then(Node::as_label) == Some(handler.end) {
            return true;
        }
        cursor = stream.next(id);
    }
    false
}

/// Find the first real node after a label and check it has the expected shape
fn expect_first_real(
    stream: &InstructionStream,
    label: SynLabel,
    expected: ExpectedShape,
) -> Result<NodeId, Error> {
    let (id, node) = stream
        .first_real_after(label)
        .ok_or(Error::MissingLabelTarget(label))?;
    if expected.matches(node) {
        Ok(id)
    } else {
        Err(Error::UnexpectedInstructionShape {
            label,
            expected,
            found: node.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{parse_listing, Instruction};

    // Two region starts placed back to back denote one position, so they get one save marker
    #[test]
    fn adjacent_starts_share_markers() {
        let mut methods = parse_listing(
            "
            method m
              a:
              b:
                nop
                return
              end:
              h:
                astore 0
                return
              try a end h *
              try b end h java/lang/Exception
            end
            ",
        )
        .unwrap();
        let code = &mut methods[0].code;
        let descriptors = TryDescriptors::collect(&code.exception_table).unwrap();
        let plan = MarkerPlan::new(&descriptors, &code.exception_table, &code.instructions).unwrap();
        let inserted = plan.apply(&mut code.instructions).unwrap();

        let [a, b] = [code.exception_table[0].start, code.exception_table[1].start];
        assert_eq!(inserted.save_markers, 1);
        assert_eq!(inserted.handler_restore_markers, 1);
        assert_eq!(inserted.new_starts.len(), 2);
        assert_eq!(inserted.new_starts[&a], inserted.new_starts[&b]);
        assert_eq!(
            code.instructions
                .first_real_after(inserted.new_starts[&a])
                .map(|(_, node)| node.clone()),
            Some(Node::Insn(Instruction::Nop))
        );
    }

    #[test]
    fn planning_does_not_mutate() {
        let methods = parse_listing(
            "
            method m
              s:
                nop
                return
              e:
              h:
                astore 0
                return
              try s e h *
            end
            ",
        )
        .unwrap();
        let code = &methods[0].code;
        let descriptors = TryDescriptors::collect(&code.exception_table).unwrap();
        let len_before = code.instructions.len();
        let plan = MarkerPlan::new(&descriptors, &code.exception_table, &code.instructions).unwrap();
        assert_eq!(code.instructions.len(), len_before);
        assert_eq!(plan.regions.len(), 1);
        assert_eq!(plan.handlers.len(), 1);
    }

    // Both entries name the same handler through different labels; the handler is entered once
    #[test]
    fn aliased_handler_labels_share_restore_marker() {
        let mut methods = parse_listing(
            "
            method m
              s:
                nop
                return
              e:
              h1:
              h2:
                astore 1
                return
              try s e h1 java/lang/Exception
              try s e h2 java/lang/Throwable
            end
            ",
        )
        .unwrap();
        let code = &mut methods[0].code;
        let descriptors = TryDescriptors::collect(&code.exception_table).unwrap();
        let plan = MarkerPlan::new(&descriptors, &code.exception_table, &code.instructions).unwrap();
        let inserted = plan.apply(&mut code.instructions).unwrap();

        assert_eq!(inserted.save_markers, 1);
        assert_eq!(inserted.region_restore_markers, 1);
        assert_eq!(inserted.handler_restore_markers, 1);
        assert_eq!(code.count_pseudo(PseudoInsn::RestoreStackInHandler), 2);

        let (store, _) = code.instructions.first_real_after(code.exception_table[1].handler).unwrap();
        let after_store = code.instructions.next(store).unwrap();
        assert_eq!(
            code.instructions.get(after_store),
            Some(&Node::Pseudo(PseudoInsn::RestoreStackInHandler))
        );
        let after_marker = code.instructions.next(after_store).unwrap();
        assert_eq!(
            code.instructions.get(after_marker),
            Some(&Node::Insn(Instruction::Return))
        );
    }

    #[test]
    fn end_between_start_and_entry_is_rejected() {
        let methods = parse_listing(
            "
            method m
              s:
              e:
                nop
                return
              h:
                astore 1
                return
              try s e h *
            end
            ",
        )
        .unwrap();
        let code = &methods[0].code;
        let descriptors = TryDescriptors::collect(&code.exception_table).unwrap();
        match MarkerPlan::new(&descriptors, &code.exception_table, &code.instructions) {
            Err(Error::MalformedExceptionTable { entry, reason }) => {
                assert_eq!(entry, 0);
                assert_eq!(reason, MalformedReason::EmptyRange);
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }
}
