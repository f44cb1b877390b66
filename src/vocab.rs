//! Symbol table mapping vocabulary words to token ids.
//!
//! Ids are assigned in first-seen order, so building a vocabulary from the
//! same data always yields the same ids. Grammars and examples refer to
//! tokens only by id; this table is what turns external symbol lists (for
//! example, hand-written negative sentences) into those ids.

use crate::grammar::TokenId;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(String),
    #[error("symbol {0:?} listed twice")]
    Duplicate(String),
}

/// Order-preserving word <-> id table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    word_to_id: FxHashMap<Box<str>, TokenId>,
    id_to_word: Vec<Box<str>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an id-ordered word list, where word `i` gets id `i`.
    pub fn from_words<I, W>(words: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        for word in words {
            let word = word.as_ref();
            if vocab.id(word).is_some() {
                return Err(VocabError::Duplicate(word.to_string()));
            }
            vocab.intern(word);
        }
        Ok(vocab)
    }

    /// Build from tokenized sentences, assigning ids in order of first
    /// occurrence.
    pub fn from_sentences<S, W>(sentences: &[S]) -> Self
    where
        S: AsRef<[W]>,
        W: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        for sentence in sentences {
            for word in sentence.as_ref() {
                vocab.intern(word.as_ref());
            }
        }
        vocab
    }

    /// Intern a word, returning its id.
    pub fn intern(&mut self, word: &str) -> TokenId {
        if let Some(&id) = self.word_to_id.get(word) {
            return id;
        }

        let id = self.id_to_word.len();
        let boxed: Box<str> = word.into();
        self.word_to_id.insert(boxed.clone(), id);
        self.id_to_word.push(boxed);
        id
    }

    pub fn id(&self, word: &str) -> Option<TokenId> {
        self.word_to_id.get(word).copied()
    }

    pub fn resolve(&self, id: TokenId) -> Option<&str> {
        self.id_to_word.get(id).map(|w| w.as_ref())
    }

    /// Number of words, which is the vocabulary size seen by grammars.
    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }

    /// Words in id order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.id_to_word.iter().map(|w| w.as_ref())
    }

    pub fn encode<W: AsRef<str>>(&self, words: &[W]) -> Result<Vec<TokenId>, VocabError> {
        words
            .iter()
            .map(|w| {
                let w = w.as_ref();
                self.id(w).ok_or_else(|| VocabError::UnknownSymbol(w.to_string()))
            })
            .collect()
    }

    /// Encode one whitespace-separated sentence.
    pub fn encode_line(&self, line: &str) -> Result<Vec<TokenId>, VocabError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        self.encode(&words)
    }

    /// Encode one sentence per line. A blank line is an empty sentence; the
    /// final line terminator does not start a new one.
    pub fn encode_lines(&self, text: &str) -> Result<Vec<Vec<TokenId>>, VocabError> {
        text.lines().map(|line| self.encode_line(line)).collect()
    }

    pub fn decode(&self, ids: &[TokenId]) -> Option<Vec<&str>> {
        ids.iter().map(|&id| self.resolve(id)).collect()
    }
}
