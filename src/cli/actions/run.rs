use super::Action;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<()> {
    match action {
        Action::Inventory { config } => crate::inventory::start(&config).await.map(|_| ()),
    }
}
