//! Fixed word tables used by the classifier.
//!
//! All entries are lowercase. ASCII entries only match on word boundaries;
//! CJK entries match anywhere in the utterance.

/// Surface form -> canonical action verb.
pub const ACTION_VERBS: &[(&str, &str)] = &[
    // build
    ("build", "build"),
    ("construct", "build"),
    ("搭建", "build"),
    ("建造", "build"),
    ("修建", "build"),
    ("盖", "build"),
    ("造", "build"),
    ("搭", "build"),
    // place
    ("place", "place"),
    ("put", "place"),
    ("放置", "place"),
    ("摆放", "place"),
    ("安放", "place"),
    ("放", "place"),
    ("摆", "place"),
    // remove
    ("remove", "remove"),
    ("clear", "remove"),
    ("delete", "remove"),
    ("移除", "remove"),
    ("清除", "remove"),
    ("拆除", "remove"),
    ("去掉", "remove"),
    // destroy
    ("destroy", "destroy"),
    ("demolish", "destroy"),
    ("break", "destroy"),
    ("摧毁", "destroy"),
    ("破坏", "destroy"),
    // decorate
    ("decorate", "decorate"),
    ("装饰", "decorate"),
    ("点缀", "decorate"),
    ("布置", "decorate"),
    // spawn
    ("spawn", "spawn"),
    ("summon", "spawn"),
    ("召唤", "spawn"),
    ("生成", "spawn"),
    ("刷出", "spawn"),
    // create
    ("create", "create"),
    ("make", "create"),
    ("craft", "create"),
    ("创造", "create"),
    ("制作", "create"),
    ("做", "create"),
    // give (items, effects)
    ("give", "give"),
    ("给我", "give"),
];

/// Explicit negations. Bare "不" is excluded: "不错" is praise.
pub const NEGATIONS: &[&str] = &[
    "不要", "不想", "不用", "不需要", "取消", "算了", "don't", "dont", "do not", "never",
    "cancel", "no need",
];

/// Markers that turn an utterance into a question.
pub const QUESTION_PREFIXES: &[&str] = &[
    "how ", "what ", "why ", "where ", "怎么", "如何", "为什么", "是不是", "能不能",
];

pub const QUESTION_SUFFIXES: &[&str] = &["吗", "呢", "么"];

/// Verbs whose block steps clear rather than place.
pub const CLEARING_ACTIONS: &[&str] = &["remove", "destroy"];

/// Filler characters trimmed from the front of a `<noun>块` match.
pub const BLOCK_NOUN_FILLERS: &[char] = &['一', '个', '的', '用', '把', '些', '块'];

/// Whether `c` counts as part of a word for boundary checks.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
