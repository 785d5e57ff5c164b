// Hook registry rewriting
//
// Reads the host's hook registrations, generates a timing proxy for each
// instrumentable one, and rewrites the host's class-resolution overrides so
// the host instantiates the proxy instead of the registered class. This is
// the only place that writes host state.

mod class_ref;
mod rewriter;
mod table;

pub use class_ref::{extract_class_name, SyntheticClassName};
pub use rewriter::{GeneratedEntry, PlannedProxy, RewriteReport, Rewriter, INSTRUMENTED_GROUPS};
pub use table::{ClassOverrides, HookEntry, HookTable, HostState};
