use {
    anyhow::Result,
    clap::Args,
    snaplist_listing::{
        DefaultsStore, ImageHost, ListingDraft, ListingPublisher, PublishError, PublishResult,
    },
};

#[derive(Args)]
pub struct PublishArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// Price in USD, e.g. 19.99.
    #[arg(long)]
    pub price: String,
    /// Defaults to the saved listing default.
    #[arg(long)]
    pub quantity: Option<u32>,
    #[arg(long)]
    pub category_id: Option<String>,
    /// NEW, LIKE_NEW, USED_EXCELLENT, USED_GOOD or USED_ACCEPTABLE.
    #[arg(long)]
    pub condition: Option<String>,
    /// Uploaded image identifier or full image URL; repeatable.
    #[arg(long = "image", required = true)]
    pub images: Vec<String>,
}

impl PublishArgs {
    /// Draft with saved defaults applied and identifiers turned into URLs.
    pub fn into_draft(self, defaults: &DefaultsStore, host: &ImageHost) -> ListingDraft {
        let image_urls = self
            .images
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(|i| {
                if i.starts_with("http://") || i.starts_with("https://") {
                    i.to_string()
                } else {
                    host.url_for(i)
                }
            })
            .collect();

        let mut draft = ListingDraft {
            title: self.title,
            description: self.description,
            price: self.price,
            quantity: self.quantity.map(|q| q.to_string()).unwrap_or_default(),
            category_id: self.category_id.unwrap_or_default(),
            condition: self.condition.unwrap_or_default(),
            image_urls,
        };
        defaults.load().apply_to(&mut draft);
        draft
    }
}

pub async fn handle_publish(
    args: PublishArgs,
    defaults: &DefaultsStore,
    host: &ImageHost,
    publisher: &ListingPublisher,
) -> Result<()> {
    let request = args.into_draft(defaults, host).validate()?;
    println!("Publishing {} as {}...", request.title(), request.sku());
    report(publisher.publish(&request).await)
}

fn report(outcome: Result<PublishResult, PublishError>) -> Result<()> {
    match outcome {
        Ok(result) => {
            match result.listing_id() {
                Some(id) => println!("Published listing {id} (offer {})", result.offer_id),
                None => println!("Published offer {}", result.offer_id),
            }
            Ok(())
        },
        Err(e) => {
            eprintln!("Failed at the {} step: {}", e.stage, e.detail);
            Err(e.into())
        },
    }
}
