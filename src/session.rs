use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::task::JoinHandle;

use crate::cart::{Cart, cart_name};
use crate::cart_cache::CartCache;
use crate::catalogue::{Catalogue, Facets, Filter, ViewRow};
use crate::formats::CartRow;
use crate::sheet_store::{SheetStore, is_sheet_not_found};
use crate::table::Table;

/// The authenticated user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub given_name: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub catalogue_sheet: String,
    pub sent_away_place: String,
    pub cache_dir: PathBuf,
}

/// One user's browsing session: the shared catalogue plus that user's cart.
///
/// The cart and the catalogue view always partition the catalogue: a row is
/// either in the cart or eligible for the view, never both. Two sessions
/// opened under the same identity overwrite each other's cart (last write
/// wins).
pub struct Session {
    cache: CartCache,
    cart_name: String,
    sent_away_place: String,
    catalogue: Catalogue,
    cart: Cart,
    background_sync: Option<JoinHandle<()>>,
}

impl Session {
    pub async fn load(
        store: Arc<dyn SheetStore>,
        settings: &SessionSettings,
        identity: &Identity,
    ) -> anyhow::Result<Self> {
        let table = store
            .read(&settings.catalogue_sheet)
            .await
            .with_context(|| format!("read catalogue sheet: {}", settings.catalogue_sheet))?;
        let catalogue = Catalogue::from_table(&table)
            .with_context(|| format!("load catalogue sheet: {}", settings.catalogue_sheet))?;

        let cart_name = cart_name(&identity.given_name);
        let cache = CartCache::new(&settings.cache_dir, &cart_name);

        let (rows, background_sync) = match cache.load().await? {
            Some(rows) => {
                tracing::debug!(cart = %cart_name, rows = rows.len(), "loaded cart from cache");
                let sync =
                    spawn_background_sync(Arc::clone(&store), cart_name.clone(), rows.clone());
                (rows, Some(sync))
            }
            None => {
                let rows = load_or_create_remote_cart(store.as_ref(), &cart_name).await?;
                cache.save(&rows).await?;
                (rows, None)
            }
        };

        for row in &rows {
            if row.origin_index >= catalogue.len() {
                tracing::warn!(
                    cart = %cart_name,
                    origin_index = row.origin_index,
                    catalogue_rows = catalogue.len(),
                    "cart row points past the end of the catalogue"
                );
            }
        }

        tracing::info!(
            user = %identity.email,
            catalogue_rows = catalogue.len(),
            cart_rows = rows.len(),
            "session loaded"
        );

        Ok(Self {
            cache,
            cart_name,
            sent_away_place: settings.sent_away_place.clone(),
            catalogue,
            cart: Cart::new(rows),
            background_sync,
        })
    }

    /// Gives a still-running background sync up to `grace` to finish before
    /// the process exits. Its outcome is still ignored.
    pub async fn finish_background_sync(&mut self, grace: Duration) {
        let Some(sync) = self.background_sync.take() else {
            return;
        };
        if tokio::time::timeout(grace, sync).await.is_err() {
            tracing::debug!(cart = %self.cart_name, "background cart sync still running at exit");
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_name(&self) -> &str {
        &self.cart_name
    }

    /// Every place except the sent-away one.
    pub fn default_filter(&self) -> Filter {
        Filter::default_for(&self.catalogue, &self.sent_away_place)
    }

    /// The catalogue minus the cart, narrowed by `filter`.
    pub fn view(&self, filter: &Filter) -> Vec<ViewRow<'_>> {
        self.catalogue.view(&self.cart.origin_indices(), filter)
    }

    pub fn facets(&self, filter: &Filter) -> Facets {
        self.catalogue.facets(&self.cart.origin_indices(), filter)
    }

    /// Moves the rows at `positions` (0-based, in `view(filter)`) into the
    /// cart and writes the cart cache. Returns the number of rows added.
    pub async fn add_selected(
        &mut self,
        filter: &Filter,
        positions: &[usize],
    ) -> anyhow::Result<usize> {
        let picked = {
            let view = self.view(filter);
            let mut picked = Vec::with_capacity(positions.len());
            for &position in positions {
                let Some(selected) = view.get(position) else {
                    anyhow::bail!(
                        "selection {} is outside the view ({} rows)",
                        position + 1,
                        view.len()
                    );
                };
                picked.push(CartRow::from_catalogue(selected.row, selected.origin_index));
            }
            picked
        };

        let added = picked.len();
        let mut next = self.cart.clone();
        next.extend(picked);
        self.cache.save(next.rows()).await?;
        self.cart = next;

        tracing::info!(
            cart = %self.cart_name,
            added,
            cart_rows = self.cart.len(),
            "added to cart"
        );
        Ok(added)
    }

    /// Returns cart rows to the catalogue view. Returns the number removed.
    pub async fn remove(&mut self, origin_indices: &[usize]) -> anyhow::Result<usize> {
        let wanted: HashSet<usize> = origin_indices.iter().copied().collect();
        let mut next = self.cart.clone();
        let removed = next.remove(&wanted);
        self.cache.save(next.rows()).await?;
        self.cart = next;

        tracing::info!(
            cart = %self.cart_name,
            removed,
            cart_rows = self.cart.len(),
            "removed from cart"
        );
        Ok(removed)
    }

    /// Empties the cart and its local cache. The remote sheet is left as is.
    pub async fn empty_cart(&mut self) -> anyhow::Result<()> {
        self.cache.save(&[]).await?;
        self.cart.clear();

        tracing::info!(cart = %self.cart_name, "emptied cart");
        Ok(())
    }

    pub fn pick_list(&self) -> String {
        self.cart.pick_list()
    }
}

async fn load_or_create_remote_cart(
    store: &dyn SheetStore,
    cart_name: &str,
) -> anyhow::Result<Vec<CartRow>> {
    match store.read(cart_name).await {
        Ok(table) => table
            .to_records()
            .with_context(|| format!("decode cart sheet: {cart_name}")),
        Err(err) if is_sheet_not_found(&err) => {
            tracing::info!(cart = %cart_name, "cart sheet missing; creating an empty one");
            let table = Table::from_records::<CartRow>(&[])?;
            store
                .create(cart_name, &table)
                .await
                .with_context(|| format!("create cart sheet: {cart_name}"))?;
            Ok(Vec::new())
        }
        Err(err) => Err(err).with_context(|| format!("read cart sheet: {cart_name}")),
    }
}

/// Writes `rows` to the cart sheet, creating the sheet when it is missing.
pub async fn sync_cart(
    store: &dyn SheetStore,
    cart_name: &str,
    rows: &[CartRow],
) -> anyhow::Result<()> {
    let table = Table::from_records(rows)?;
    match store.update(cart_name, &table).await {
        Ok(()) => Ok(()),
        Err(err) if is_sheet_not_found(&err) => store.create(cart_name, &table).await,
        Err(err) => Err(err),
    }
}

/// Best-effort mirror of the cached cart to the remote sheet.
///
/// Nothing retries it and a failure never reaches the session; the handle
/// only lets the process wait for it on the way out.
fn spawn_background_sync(
    store: Arc<dyn SheetStore>,
    cart_name: String,
    rows: Vec<CartRow>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = sync_cart(store.as_ref(), &cart_name, &rows).await {
            tracing::debug!(cart = %cart_name, "background cart sync failed: {err:#}");
        }
    })
}
