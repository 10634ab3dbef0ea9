//! Command bus shared by the table surfaces and the visualization surface
//!
//! A command is sent synchronously to every subscriber in subscription
//! order. For "set visual attribute" commands the first subscriber that
//! applies the attribute marks the command handled, and later subscribers
//! never see it. The bus keeps no queue: if nobody is in a state to act on
//! a command, the command is simply not applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::graph::CollapsedGroupId;
use crate::visual::{Color, EdgeVisibility, VertexShape, VertexVisibility};

/// Visual attributes that can be set on selected table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualAttribute {
    Color,
    Alpha,
    EdgeWidth,
    EdgeVisibility,
    VertexShape,
    VertexRadius,
    VertexVisibility,
}

/// The value carried by a "set visual attribute" command.
///
/// Numeric values are in table units (alpha is an opacity percentage,
/// radius and width are the values a user would type into the table).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Color(Color),
    Alpha(f32),
    EdgeWidth(f32),
    EdgeVisibility(EdgeVisibility),
    VertexShape(VertexShape),
    VertexRadius(f32),
    VertexVisibility(VertexVisibility),
}

impl AttributeValue {
    /// The attribute this value sets
    pub fn attribute(&self) -> VisualAttribute {
        match self {
            AttributeValue::Color(_) => VisualAttribute::Color,
            AttributeValue::Alpha(_) => VisualAttribute::Alpha,
            AttributeValue::EdgeWidth(_) => VisualAttribute::EdgeWidth,
            AttributeValue::EdgeVisibility(_) => VisualAttribute::EdgeVisibility,
            AttributeValue::VertexShape(_) => VisualAttribute::VertexShape,
            AttributeValue::VertexRadius(_) => VisualAttribute::VertexRadius,
            AttributeValue::VertexVisibility(_) => VisualAttribute::VertexVisibility,
        }
    }
}

/// Commands that carry no parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoParamCommand {
    UpdateLayout,
    ReadWorkbook,
    ShowGraphAndReadWorkbook,
    LoadUserSettings,
    SaveUserSettings,
    ShowGraphLegend,
    HideGraphLegend,
    ShowGraphAxes,
    HideGraphAxes,
    AutoFillWorkbook,
    ShowGraphMetrics,
    ShowDynamicFilters,
    ImportFromGraphMLFile,
    ImportFromPajekFile,
    ImportFromUcinetFile,
    ImportFromMatrixWorkbook,
    ExportToGraphMLFile,
    ExportToPajekFile,
    ExportToUcinetFile,
    ExportToNewMatrixWorkbook,
}

/// Group commands the user can run against the group table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupCommand {
    CollapseSelectedGroups,
    ExpandSelectedGroups,
    CollapseAllGroups,
    ExpandAllGroups,
}

impl GroupCommand {
    pub fn collapses(&self) -> bool {
        matches!(
            self,
            GroupCommand::CollapseSelectedGroups | GroupCommand::CollapseAllGroups
        )
    }

    pub fn applies_to_selection(&self) -> bool {
        matches!(
            self,
            GroupCommand::CollapseSelectedGroups | GroupCommand::ExpandSelectedGroups
        )
    }
}

/// A "set visual attribute" request plus the handled flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVisualAttribute {
    pub value: AttributeValue,
    pub handled: bool,
}

impl SetVisualAttribute {
    pub fn new(value: AttributeValue) -> Self {
        Self {
            value,
            handled: false,
        }
    }

    pub fn attribute(&self) -> VisualAttribute {
        self.value.attribute()
    }
}

/// Everything that travels over the command bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    NoParam(NoParamCommand),
    SetVisualAttribute(SetVisualAttribute),
    CollapseOrExpandGroups {
        collapse: bool,
        groups: Vec<CollapsedGroupId>,
    },
}

impl Command {
    pub fn set_visual_attribute(value: AttributeValue) -> Self {
        Command::SetVisualAttribute(SetVisualAttribute::new(value))
    }

    /// Whether some subscriber already applied this command
    pub fn is_handled(&self) -> bool {
        matches!(self, Command::SetVisualAttribute(cmd) if cmd.handled)
    }
}

/// A surface that reacts to commands
pub trait CommandHandler: Send + Sync {
    fn on_command_sent(&self, command: &mut Command);
}

/// Identifies one subscription so it can be removed later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous publish/subscribe channel for commands
pub struct CommandBus {
    handlers: RwLock<Vec<(SubscriptionId, Arc<dyn CommandHandler>)>>,
    next_id: AtomicU64,
}

impl CommandBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a handler; delivery follows subscription order
    pub fn subscribe(&self, handler: Arc<dyn CommandHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    /// Subscribe a closure
    pub fn subscribe_fn<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&mut Command) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnCommandHandler(f)))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Deliver a command to every subscriber.
    ///
    /// Returns how many subscribers were invoked. Handlers run outside the
    /// subscription lock, so a handler may itself send commands.
    pub fn send(&self, command: &mut Command) -> usize {
        let handlers: Vec<Arc<dyn CommandHandler>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut delivered = 0;
        for handler in handlers {
            if command.is_handled() {
                break;
            }
            handler.on_command_sent(command);
            delivered += 1;
        }

        tracing::trace!("Command {:?} delivered to {} subscriber(s)", command, delivered);
        delivered
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

struct FnCommandHandler<F>(F);

impl<F> CommandHandler for FnCommandHandler<F>
where
    F: Fn(&mut Command) + Send + Sync,
{
    fn on_command_sent(&self, command: &mut Command) {
        (self.0)(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_first_applicable_handler_wins() {
        let bus = CommandBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        bus.subscribe_fn(move |_cmd| log.lock().push("ignores"));

        let log = seen.clone();
        bus.subscribe_fn(move |cmd| {
            log.lock().push("applies");
            if let Command::SetVisualAttribute(set) = cmd {
                set.handled = true;
            }
        });

        let log = seen.clone();
        bus.subscribe_fn(move |_cmd| log.lock().push("never reached"));

        let mut cmd = Command::set_visual_attribute(AttributeValue::Alpha(50.0));
        let delivered = bus.send(&mut cmd);

        assert_eq!(delivered, 2);
        assert!(cmd.is_handled());
        assert_eq!(*seen.lock(), vec!["ignores", "applies"]);
    }

    #[test]
    fn test_no_param_commands_reach_everyone() {
        let bus = CommandBus::new();
        let count = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let count = count.clone();
            bus.subscribe_fn(move |_cmd| *count.lock() += 1);
        }

        let mut cmd = Command::NoParam(NoParamCommand::UpdateLayout);
        assert_eq!(bus.send(&mut cmd), 3);
        assert_eq!(*count.lock(), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = CommandBus::new();
        let id = bus.subscribe_fn(|_cmd| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        let mut cmd = Command::NoParam(NoParamCommand::SaveUserSettings);
        assert_eq!(bus.send(&mut cmd), 0);
    }

    #[test]
    fn test_attribute_value_kind() {
        assert_eq!(
            AttributeValue::VertexShape(VertexShape::Disk).attribute(),
            VisualAttribute::VertexShape
        );
        assert_eq!(
            AttributeValue::Color(Color::BLACK).attribute(),
            VisualAttribute::Color
        );
    }
}
