use {
    anyhow::Result,
    clap::Subcommand,
    snaplist_listing::{Condition, DefaultsStore},
};

#[derive(Subcommand)]
pub enum DefaultsAction {
    /// Show the values new listings start from.
    Show,
    /// Change listing defaults; omitted fields keep their value.
    Set {
        #[arg(long)]
        category_id: Option<String>,
        #[arg(long)]
        condition: Option<Condition>,
        #[arg(long)]
        quantity: Option<u32>,
    },
}

pub fn handle_defaults(action: DefaultsAction, store: &DefaultsStore) -> Result<()> {
    match action {
        DefaultsAction::Show => {},
        DefaultsAction::Set {
            category_id,
            condition,
            quantity,
        } => {
            let mut defaults = store.load();
            if let Some(category_id) = category_id {
                defaults.category_id = category_id.trim().to_string();
            }
            if let Some(condition) = condition {
                defaults.condition = condition;
            }
            if let Some(quantity) = quantity {
                defaults.quantity = quantity;
            }
            store.save(&defaults)?;
            println!("Saved to {}", store.path().display());
        },
    }

    let defaults = store.load();
    let category = if defaults.category_id.is_empty() {
        "(unset)"
    } else {
        defaults.category_id.as_str()
    };
    println!("category id: {category}");
    println!("condition:   {}", defaults.condition);
    println!("quantity:    {}", defaults.quantity);
    Ok(())
}
