//! ledgerlens-structure: statement processors, the processor factory,
//! persistence sinks and the end-to-end pipeline.

pub mod factory;
pub mod instruction;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod sink;

pub use factory::ProcessorFactory;
pub use instruction::build_instruction;
pub use model::{Instruction, LanguageModel, ModelError};
pub use pipeline::{PersistenceOutcome, Pipeline, PipelineFailure, RunOutput, Stage};
pub use processor::{
    ChequingProcessor, CreditCardProcessor, ProcessingFailure, ProcessorConfig, StatementProcessor,
};
pub use sink::{JsonDirSink, JsonFileSink, PersistenceFailure, RecordSink};
