pub mod axis;
pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod pool;
pub mod predicate;
pub mod simple_node;
pub mod step;
pub mod template;
pub mod traverse;

pub use axis::Axis;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::{EvalContext, FrameId, VarValue};
pub use cursor::{CachedCursor, ChildUnionCursor, Cursor, NodeCursor, PathCursor, StepCursor, UnionCursor};
pub use error::{Error, ErrorCode, Result};
pub use evaluate::{evaluate_first, evaluate_path, evaluate_raw, exists};
pub use model::{ExpandedType, NodeKind, QName, XdmNode, compare_nodes, is_before, root_of};
pub use pool::{CursorPool, PoolStats};
pub use predicate::{FnPredicate, PathPredicate, PositionPredicate, Positional, Predicate};
pub use simple_node::{SimpleNode, SimpleNodeBuilder, attr, doc as simple_doc, elem, ns, text};
pub use step::{FastMatch, NodeTest, StepDescriptor, StepRole, TestOutcome};
pub use template::{LocationPath, PathExpr, TemplateId, UnionExpr};
pub use traverse::{AxisWalk, first_on_axis, next_on_axis};
