use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use market_auth::{HasRole, Identity, Principal, UserRef};
use market_core::{DomainError, Entity, Money, ProductId};

/// Maximum product name length (characters).
pub const MAX_NAME_LEN: usize = 200;
/// Maximum image URL length (characters).
pub const MAX_IMAGE_URL_LEN: usize = 500;

/// Approval metadata.
///
/// A product is approved exactly when it carries one of these, so the
/// timestamp and the approving admin can never be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub approved_at: DateTime<Utc>,
    pub approved_by: UserRef,
}

/// Catalog entry.
///
/// Lifecycle: created unapproved (or approved when an admin creates it),
/// approved by an admin, then never mutated again except deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: String,
    /// `None` for system-seeded products.
    pub owner: Option<UserRef>,
    pub approval: Option<Approval>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: SubmitProduct.
///
/// Fields are kept as the caller sent them; presence and format are checked
/// by [`Product::submit`] after the creator's role has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    /// Decimal amount as text (e.g. `"700"`, `"12.50"`).
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Check that the identity may submit products and return its principal.
///
/// Guests must log in first; authenticated users need the artisan or admin role.
pub fn authorize_submission(creator: &Identity) -> Result<&Principal, DomainError> {
    let principal = creator
        .principal()
        .ok_or_else(|| DomainError::authentication("Please login to add products."))?;
    if !principal.is_artisan() && !principal.is_admin() {
        return Err(DomainError::permission(
            "Only registered village artisans can add products.",
        ));
    }
    Ok(principal)
}

/// Check that the identity may approve products.
pub fn authorize_approval(actor: &Identity) -> Result<&Principal, DomainError> {
    match actor.principal() {
        Some(p) if p.is_admin() => Ok(p),
        _ => Err(DomainError::permission("Only admins can approve products.")),
    }
}

impl Product {
    /// Decide the product created by a submission.
    ///
    /// Admin submissions are approved on the spot (approved by the submitting admin).
    pub fn submit(creator: &Identity, cmd: SubmitProduct) -> Result<Product, DomainError> {
        let principal = authorize_submission(creator)?;

        let name = non_blank(cmd.name);
        let price = non_blank(cmd.price);
        let image_url = non_blank(cmd.image_url);
        let (Some(name), Some(price), Some(image_url)) = (name, price, image_url) else {
            return Err(DomainError::validation("Name, price, and image URL are required"));
        };

        let price = Money::parse_decimal(&price)?;
        if price.is_zero() {
            return Err(DomainError::validation("Price must be greater than zero"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "Name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if image_url.chars().count() > MAX_IMAGE_URL_LEN {
            return Err(DomainError::validation(format!(
                "Image URL must be at most {MAX_IMAGE_URL_LEN} characters"
            )));
        }

        let approval = principal.is_admin().then(|| Approval {
            approved_at: cmd.occurred_at,
            approved_by: principal.user_ref(),
        });

        Ok(Product {
            id: cmd.product_id,
            name,
            price,
            image_url,
            owner: Some(principal.user_ref()),
            approval,
            created_at: cmd.occurred_at,
        })
    }

    /// Build a system-owned catalog entry (seed data).
    pub fn seeded(
        id: ProductId,
        name: impl Into<String>,
        price: Money,
        image_url: impl Into<String>,
        approval: Option<Approval>,
        created_at: DateTime<Utc>,
    ) -> Product {
        Product {
            id,
            name: name.into(),
            price,
            image_url: image_url.into(),
            owner: None,
            approval,
            created_at,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approval.is_some()
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approval.as_ref().map(|a| a.approved_at)
    }

    pub fn approved_by(&self) -> Option<&UserRef> {
        self.approval.as_ref().map(|a| &a.approved_by)
    }

    /// Record an approval.
    ///
    /// There is no guard against re-approval: approving again replaces the
    /// metadata with the new admin and time.
    pub fn approve(&mut self, admin: &Principal, at: DateTime<Utc>) {
        self.approval = Some(Approval {
            approved_at: at,
            approved_by: admin.user_ref(),
        });
    }

    pub fn is_owned_by(&self, viewer: &Identity) -> bool {
        match (&self.owner, viewer.user_id()) {
            (Some(owner), Some(uid)) => owner.id == uid,
            _ => false,
        }
    }

    /// Visibility policy: guests see approved products, users additionally see
    /// their own submissions, admins see everything.
    pub fn is_visible_to(&self, viewer: &Identity) -> bool {
        if viewer.is_admin() {
            return true;
        }
        self.is_approved() || self.is_owned_by(viewer)
    }

    /// Products waiting for approval can only be carted by admins.
    pub fn ensure_purchasable_by(&self, buyer: &Identity) -> Result<(), DomainError> {
        if self.is_approved() || buyer.is_admin() {
            Ok(())
        } else {
            Err(DomainError::permission(
                "This product is pending approval and cannot be added to cart yet.",
            ))
        }
    }

    /// Deletion is reserved to the owner and admins; guests must log in first.
    pub fn authorize_deletion(&self, actor: &Identity) -> Result<(), DomainError> {
        if !actor.is_authenticated() {
            return Err(DomainError::authentication("Authentication required"));
        }
        if self.is_owned_by(actor) || actor.is_admin() {
            Ok(())
        } else {
            Err(DomainError::permission("You can't delete this item"))
        }
    }

    /// Message reported to the submitter.
    pub fn submission_message(&self) -> &'static str {
        if self.is_approved() {
            "Product added successfully"
        } else {
            "Product submitted for approval"
        }
    }
}

/// A catalog row as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub product: Product,
    pub owned: bool,
}

/// Apply the visibility policy to a set of products, ordered by name.
pub fn catalog_for(viewer: &Identity, products: Vec<Product>) -> Vec<ProductListing> {
    let mut rows: Vec<ProductListing> = products
        .into_iter()
        .filter(|p| p.is_visible_to(viewer))
        .map(|product| ProductListing {
            owned: product.is_owned_by(viewer),
            product,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.product
            .name
            .cmp(&b.product.name)
            .then_with(|| a.product.id.cmp(&b.product.id))
    });
    rows
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
