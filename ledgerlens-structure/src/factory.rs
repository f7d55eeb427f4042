use std::sync::Arc;

use ledgerlens_core::{StatementKind, UnsupportedKind};

use crate::model::LanguageModel;
use crate::processor::{ChequingProcessor, CreditCardProcessor, ProcessorConfig, StatementProcessor};

/// Maps a statement kind to its processor. Holds only read-only state, so
/// one factory can serve any number of concurrent runs.
#[derive(Clone)]
pub struct ProcessorFactory {
    model: Arc<dyn LanguageModel>,
    config: ProcessorConfig,
}

impl ProcessorFactory {
    pub fn new(model: Arc<dyn LanguageModel>, config: ProcessorConfig) -> Self {
        Self { model, config }
    }

    pub fn supported_kinds() -> &'static [StatementKind] {
        &StatementKind::ALL
    }

    pub fn for_kind(&self, kind: StatementKind) -> Result<StatementProcessor, UnsupportedKind> {
        let processor = match kind {
            StatementKind::CreditCard => {
                StatementProcessor::CreditCard(CreditCardProcessor::new(self.model.clone(), self.config))
            }
            StatementKind::Chequing => {
                StatementProcessor::Chequing(ChequingProcessor::new(self.model.clone(), self.config))
            }
        };
        Ok(processor)
    }

    /// Resolve a selector string such as `"credit-card"` or `"chequing"`.
    pub fn for_selector(&self, selector: &str) -> Result<StatementProcessor, UnsupportedKind> {
        self.for_kind(selector.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instruction, ModelError};
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl LanguageModel for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn complete(&self, _instruction: &Instruction) -> Result<String, ModelError> {
            Err(ModelError::EmptyResponse)
        }
    }

    fn factory() -> ProcessorFactory {
        ProcessorFactory::new(Arc::new(Unused), ProcessorConfig::default())
    }

    #[test]
    fn test_total_over_kinds() {
        let f = factory();
        for kind in ProcessorFactory::supported_kinds() {
            let p = f.for_kind(*kind).unwrap();
            assert_eq!(p.kind(), *kind);
        }
    }

    #[test]
    fn test_selector_lookup() {
        let f = factory();
        assert_eq!(f.for_selector("credit-card").unwrap().kind(), StatementKind::CreditCard);
        assert_eq!(f.for_selector("chequing").unwrap().kind(), StatementKind::Chequing);
    }

    #[test]
    fn test_unknown_selector_is_unsupported() {
        let err = factory().for_selector("brokerage").err().unwrap();
        assert_eq!(err, UnsupportedKind("brokerage".to_string()));
    }
}
