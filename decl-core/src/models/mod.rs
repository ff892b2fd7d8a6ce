mod amount;
mod declaration;
mod declaration_status;
mod fee_breakdown;
mod fee_config;
mod payment_type;

pub use amount::{parse_amount, validate_amount};
pub use declaration::{Declaration, DeclarationId, DeclarationPatch};
pub use declaration_status::DeclarationStatus;
pub use fee_breakdown::FeeBreakdown;
pub use fee_config::FeeConfig;
pub use payment_type::PaymentType;
