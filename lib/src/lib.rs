//! Operand stack repair for `try`/`catch` regions in JVM method bodies
//!
//! Method bodies stitched together from decompiled or inlined fragments may enter a protected
//! region (or one of its handlers) with extra values still sitting on the operand stack. The JVM
//! verifier rejects that, so before lowering we surround every region start and handler start
//! with pseudo-instructions that a later pass turns into real stack spills and fills.
//!
//!   - [`jvm`] holds the instruction model the pass operates on
//!   - [`repair`] holds the pass itself
//!
//! ```
//! use stackfix::jvm::code::parse_listing;
//! use stackfix::repair::{repair_method, Settings};
//!
//! # fn run() -> Result<(), stackfix::repair::Error> {
//! let mut methods = parse_listing(
//!     "
//!     method foo
//!       start:
//!         nop
//!         aload 0
//!         athrow
//!       end:
//!       handler:
//!         astore 1
//!         return
//!       try start end handler java/lang/Exception
//!     end
//!     ",
//! )?;
//! let summary = repair_method(&mut methods[0], &Settings::default())?;
//! assert_eq!(summary.save_markers, 1);
//! assert_eq!(summary.handler_restore_markers, 1);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

pub mod jvm;
pub mod repair;
