//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod attachment;
pub mod audit_event;
pub mod invoice;
pub mod invoice_line;
pub mod partner;
pub mod request;
pub mod request_document;
pub mod request_type;
pub mod requirement;
pub mod sequence;
pub mod stage;
pub mod type_requirement;
pub mod type_stage;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use attachment::{Column as AttachmentColumn, Entity as Attachment, Model as AttachmentModel};
pub use audit_event::{
    Column as AuditEventColumn, Entity as AuditEvent, Model as AuditEventModel,
};
pub use invoice::{
    Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel, PaymentState,
};
pub use invoice_line::{
    Column as InvoiceLineColumn, Entity as InvoiceLine, Model as InvoiceLineModel,
};
pub use partner::{Column as PartnerColumn, Entity as Partner, Model as PartnerModel};
pub use request::{Column as RequestColumn, Decision, Entity as Request, Model as RequestModel};
pub use request_document::{
    Column as RequestDocumentColumn, DocumentStatus, Entity as RequestDocument,
    Model as RequestDocumentModel,
};
pub use request_type::{
    Column as RequestTypeColumn, Entity as RequestType, Model as RequestTypeModel,
};
pub use requirement::{
    Column as RequirementColumn, Entity as Requirement, Model as RequirementModel,
};
pub use sequence::{Column as SequenceColumn, Entity as Sequence, Model as SequenceModel};
pub use stage::{Column as StageColumn, Entity as Stage, Model as StageModel};
pub use type_requirement::Entity as TypeRequirement;
pub use type_stage::Entity as TypeStage;
