//! Per-language line-pattern strategy tables.
//!
//! Each [`LanguageSpec`] provides the same fixed set of matchers: loop,
//! condition, and return markers, assignment and declaration shapes, call and
//! identifier extraction, a keyword exclusion set, and a boilerplate-call
//! filter. The dependence-graph builder and the default tokenizer are both
//! driven by these tables, so adding a language never touches a call site.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Language;

/// Classification of a single stripped source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Bare braces, blank or preprocessor noise: never becomes a node.
    Skip,
    /// A loop header.
    Loop,
    /// A branching construct header.
    Condition,
    /// A return statement.
    Return,
    /// An assignment (including compound assignment).
    Assignment,
    /// A function call not captured by a more specific kind.
    Call,
    /// Anything else.
    Statement,
}

/// A labeled structural pattern: the matcher plus the skeleton node label it
/// produces.
struct Labeled {
    regex: Regex,
    label: &'static str,
}

impl Labeled {
    fn new(pattern: &str, label: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("static pattern table regex"),
            label,
        }
    }
}

/// Matcher table for one language.
pub struct LanguageSpec {
    language: Language,
    loops: Vec<Labeled>,
    conditions: Vec<Labeled>,
    return_stmt: Regex,
    assignment: Regex,
    declaration: Option<Regex>,
    function_def: Regex,
    call: Regex,
    identifier: Regex,
    keywords: &'static [&'static str],
    boilerplate_calls: &'static [&'static str],
}

// The assignment shape shared by every C-family table. The trailing
// `(?:[^=]|$)` rejects `==` without lookahead support.
const ASSIGNMENT: &str = r"(\b[a-zA-Z_]\w*)\s*[+\-*/%&|^]?=(?:[^=]|$)";
const IDENTIFIER: &str = r"\b([a-zA-Z_]\w*)\b";

static CPP_SPEC: Lazy<LanguageSpec> = Lazy::new(|| LanguageSpec {
    language: Language::Cpp,
    loops: vec![
        Labeled::new(r"\bfor\s*\(", "for_statement"),
        Labeled::new(r"\bwhile\s*\(", "while_statement"),
        Labeled::new(r"\bdo\s*\{", "do_statement"),
    ],
    conditions: vec![
        Labeled::new(r"\belse\s+if\s*\(", "if_statement"),
        Labeled::new(r"\bif\s*\(", "if_statement"),
        Labeled::new(r"\bswitch\s*\(", "switch_statement"),
    ],
    return_stmt: Regex::new(r"\breturn\b").unwrap(),
    assignment: Regex::new(ASSIGNMENT).unwrap(),
    declaration: Some(
        Regex::new(
            r"(?:int|float|double|char|bool|long|short|unsigned|auto|string|vector|map|set)\s+(\w+)",
        )
        .unwrap(),
    ),
    function_def: Regex::new(
        r"(?:[\w\s\*&:<>]+)\s+(\w+)\s*\([^;{]*\)\s*(?:const)?\s*(?:override)?\s*\{",
    )
    .unwrap(),
    call: Regex::new(r"\b(\w+)\s*\([^;]*\)").unwrap(),
    identifier: Regex::new(IDENTIFIER).unwrap(),
    keywords: CPP_KEYWORDS,
    boilerplate_calls: CPP_BOILERPLATE,
});

static C_SPEC: Lazy<LanguageSpec> = Lazy::new(|| LanguageSpec {
    language: Language::C,
    loops: vec![
        Labeled::new(r"\bfor\s*\(", "for_statement"),
        Labeled::new(r"\bwhile\s*\(", "while_statement"),
        Labeled::new(r"\bdo\s*\{", "do_statement"),
    ],
    conditions: vec![
        Labeled::new(r"\belse\s+if\s*\(", "if_statement"),
        Labeled::new(r"\bif\s*\(", "if_statement"),
        Labeled::new(r"\bswitch\s*\(", "switch_statement"),
    ],
    return_stmt: Regex::new(r"\breturn\b").unwrap(),
    assignment: Regex::new(ASSIGNMENT).unwrap(),
    declaration: Some(
        Regex::new(r"(?:int|float|double|char|long|short|unsigned|signed)\s+(\w+)").unwrap(),
    ),
    function_def: Regex::new(r"(?:[\w\s\*]+)\s+(\w+)\s*\([^;{]*\)\s*\{").unwrap(),
    call: Regex::new(r"\b(\w+)\s*\([^;]*\)").unwrap(),
    identifier: Regex::new(IDENTIFIER).unwrap(),
    keywords: C_KEYWORDS,
    boilerplate_calls: C_BOILERPLATE,
});

static JAVA_SPEC: Lazy<LanguageSpec> = Lazy::new(|| LanguageSpec {
    language: Language::Java,
    loops: vec![
        Labeled::new(r"\bfor\s*\(", "for_statement"),
        Labeled::new(r"\bwhile\s*\(", "while_statement"),
        Labeled::new(r"\bdo\s*\{", "do_statement"),
    ],
    conditions: vec![
        Labeled::new(r"\belse\s+if\s*\(", "if_statement"),
        Labeled::new(r"\bif\s*\(", "if_statement"),
        Labeled::new(r"\bswitch\s*\(", "switch_statement"),
    ],
    return_stmt: Regex::new(r"\breturn\b").unwrap(),
    assignment: Regex::new(ASSIGNMENT).unwrap(),
    declaration: Some(
        Regex::new(r"(?:int|float|double|char|boolean|long|short|byte|String|List|Map|Set|Array)\s+(\w+)")
            .unwrap(),
    ),
    function_def: Regex::new(
        r"(?:public|private|protected)?\s*(?:static)?\s*(?:final)?\s*\w+(?:<[^>]+>)?\s+(\w+)\s*\([^)]*\)\s*(?:throws\s+\w+)?\s*\{",
    )
    .unwrap(),
    call: Regex::new(r"\b(\w+)\s*\([^;]*\)").unwrap(),
    identifier: Regex::new(IDENTIFIER).unwrap(),
    keywords: JAVA_KEYWORDS,
    boilerplate_calls: JAVA_BOILERPLATE,
});

static PYTHON_SPEC: Lazy<LanguageSpec> = Lazy::new(|| LanguageSpec {
    language: Language::Python,
    loops: vec![
        Labeled::new(r"\bfor\s+\w+\s+in\b", "for_statement"),
        Labeled::new(r"\bwhile\s+", "while_statement"),
    ],
    conditions: vec![
        Labeled::new(r"\belif\s+", "if_statement"),
        Labeled::new(r"\bif\s+", "if_statement"),
    ],
    return_stmt: Regex::new(r"\breturn\b").unwrap(),
    assignment: Regex::new(ASSIGNMENT).unwrap(),
    declaration: None,
    function_def: Regex::new(r"def\s+(\w+)\s*\(").unwrap(),
    call: Regex::new(r"\b(\w+)\s*\([^)]*\)").unwrap(),
    identifier: Regex::new(IDENTIFIER).unwrap(),
    keywords: PYTHON_KEYWORDS,
    boilerplate_calls: PYTHON_BOILERPLATE,
});

static JAVASCRIPT_SPEC: Lazy<LanguageSpec> = Lazy::new(|| LanguageSpec {
    language: Language::JavaScript,
    loops: vec![
        Labeled::new(r"\bfor\s*\(", "for_statement"),
        Labeled::new(r"\bwhile\s*\(", "while_statement"),
        Labeled::new(r"\bdo\s*\{", "do_statement"),
    ],
    conditions: vec![
        Labeled::new(r"\belse\s+if\s*\(", "if_statement"),
        Labeled::new(r"\bif\s*\(", "if_statement"),
        Labeled::new(r"\bswitch\s*\(", "switch_statement"),
    ],
    return_stmt: Regex::new(r"\breturn\b").unwrap(),
    assignment: Regex::new(ASSIGNMENT).unwrap(),
    declaration: Some(Regex::new(r"(?:let|var|const)\s+(\w+)").unwrap()),
    function_def: Regex::new(r"\bfunction\s+(\w+)\s*\(").unwrap(),
    call: Regex::new(r"\b(\w+)\s*\([^;]*\)").unwrap(),
    identifier: Regex::new(IDENTIFIER).unwrap(),
    keywords: JAVASCRIPT_KEYWORDS,
    boilerplate_calls: JAVASCRIPT_BOILERPLATE,
});

impl LanguageSpec {
    /// Look up the strategy table for a language.
    pub fn for_language(language: Language) -> &'static LanguageSpec {
        match language {
            Language::C => &C_SPEC,
            Language::Cpp => &CPP_SPEC,
            Language::Java => &JAVA_SPEC,
            Language::Python => &PYTHON_SPEC,
            Language::JavaScript => &JAVASCRIPT_SPEC,
        }
    }

    /// The language this table belongs to.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Keyword exclusion set for identifier extraction.
    pub fn keywords(&self) -> &'static [&'static str] {
        self.keywords
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(&word)
    }

    fn is_boilerplate_call(&self, word: &str) -> bool {
        self.boilerplate_calls.contains(&word)
    }

    /// Whether a stripped line is a comment (or preprocessor noise in the
    /// C family).
    pub fn is_comment(&self, line: &str) -> bool {
        match self.language {
            Language::Python => line.starts_with('#'),
            _ => {
                line.starts_with("//")
                    || line.starts_with("/*")
                    || line.starts_with('*')
                    || line.starts_with("#include")
                    || line.starts_with("#define")
                    || line.starts_with("#pragma")
            }
        }
    }

    /// Classify a stripped, non-comment line.
    ///
    /// Precedence: skip, loop, condition, return, assignment, call,
    /// statement.
    pub fn classify(&self, line: &str) -> LineKind {
        if matches!(line, "" | "{" | "}" | "};") || line.starts_with("//") || line.starts_with('#')
        {
            return LineKind::Skip;
        }
        if self.loops.iter().any(|p| p.regex.is_match(line)) {
            return LineKind::Loop;
        }
        if self.conditions.iter().any(|p| p.regex.is_match(line)) {
            return LineKind::Condition;
        }
        if self.return_stmt.is_match(line) {
            return LineKind::Return;
        }
        if self.assignment.is_match(line) {
            return LineKind::Assignment;
        }
        if self.call.is_match(line) {
            return LineKind::Call;
        }
        LineKind::Statement
    }

    /// The skeleton node label for a line, if the line is structural.
    pub fn skeleton_label(&self, line: &str) -> Option<&'static str> {
        if self.is_function_def(line) {
            return Some("function_definition");
        }
        for p in &self.loops {
            if p.regex.is_match(line) {
                return Some(p.label);
            }
        }
        for p in &self.conditions {
            if p.regex.is_match(line) {
                return Some(p.label);
            }
        }
        if self.return_stmt.is_match(line) {
            return Some("return_statement");
        }
        None
    }

    /// Whether a line opens a function definition.
    pub fn is_function_def(&self, line: &str) -> bool {
        self.function_def.is_match(line)
    }

    /// Names of all functions defined in a source text. Control keywords
    /// that happen to match the C-family header shape are not functions.
    pub fn defined_functions(&self, source: &str) -> BTreeSet<String> {
        self.function_def
            .captures_iter(source)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|name| !self.is_keyword(name))
            .collect()
    }

    /// Variables defined (declared or assigned) on a line.
    ///
    /// ALL-CAPS assignment targets are treated as constants, not variables.
    pub fn defined_variables(&self, line: &str) -> BTreeSet<String> {
        let mut defined = BTreeSet::new();

        if let Some(decl) = &self.declaration {
            for cap in decl.captures_iter(line) {
                if let Some(var) = cap.get(1) {
                    let var = var.as_str();
                    if !self.is_keyword(var) {
                        defined.insert(var.to_string());
                    }
                }
            }
        }

        for cap in self.assignment.captures_iter(line) {
            if let Some(var) = cap.get(1) {
                let var = var.as_str();
                if !self.is_keyword(var) && !is_all_caps(var) {
                    defined.insert(var.to_string());
                }
            }
        }

        defined
    }

    /// Variables read on a line: all identifiers minus keywords, the line's
    /// own definitions, constants, type-like capitalized tokens, and
    /// single-character tokens.
    pub fn used_variables(&self, line: &str, defined_in_line: &BTreeSet<String>) -> BTreeSet<String> {
        let mut used = BTreeSet::new();

        for cap in self.identifier.captures_iter(line) {
            if let Some(var) = cap.get(1) {
                let var = var.as_str();
                let type_like = var.chars().next().is_some_and(|c| c.is_ascii_uppercase());
                if !self.is_keyword(var)
                    && !defined_in_line.contains(var)
                    && !is_all_caps(var)
                    && !type_like
                    && var.len() > 1
                {
                    used.insert(var.to_string());
                }
            }
        }

        used
    }

    /// Function calls on a line, with keywords, control headers, constants,
    /// and boilerplate I/O calls filtered out.
    pub fn call_targets(&self, line: &str) -> Vec<String> {
        let mut calls = Vec::new();

        for cap in self.call.captures_iter(line) {
            if let Some(func) = cap.get(1) {
                let func = func.as_str();
                if !self.is_keyword(func)
                    && !self.is_boilerplate_call(func)
                    && !is_all_caps(func)
                    && !matches!(func, "if" | "for" | "while" | "switch" | "catch")
                {
                    calls.push(func.to_string());
                }
            }
        }

        calls
    }
}

/// True when a token is an ALL-CAPS constant name (`INT_MAX`, `MOD`).
fn is_all_caps(word: &str) -> bool {
    let mut has_alpha = false;
    for c in word.chars() {
        if c.is_ascii_alphabetic() {
            if c.is_ascii_lowercase() {
                return false;
            }
            has_alpha = true;
        }
    }
    has_alpha
}

const CPP_KEYWORDS: &[&str] = &[
    "int", "float", "double", "char", "void", "bool", "long", "short", "unsigned", "signed",
    "const", "static", "extern", "register", "volatile", "inline", "virtual", "override", "final",
    "explicit", "if", "else", "for", "while", "do", "switch", "case", "default", "break",
    "continue", "return", "goto", "throw", "try", "catch", "class", "struct", "union", "enum",
    "namespace", "using", "typedef", "public", "private", "protected", "friend", "template",
    "typename", "new", "delete", "this", "nullptr", "true", "false", "sizeof", "auto", "decltype",
    "constexpr", "noexcept", "operator", "vector", "string", "map", "set", "pair", "array",
    "list", "deque", "queue", "stack", "priority_queue", "unordered_map", "unordered_set", "cout",
    "cin", "endl", "std", "printf", "scanf", "main", "include", "define", "ifdef", "ifndef",
    "endif", "pragma", "max", "min", "abs", "sort", "find", "begin", "end", "size", "push_back",
    "INT_MIN", "INT_MAX", "LLONG_MIN", "LLONG_MAX", "NULL",
];

const C_KEYWORDS: &[&str] = &[
    "int", "float", "double", "char", "void", "long", "short", "unsigned", "signed", "const",
    "static", "extern", "register", "volatile", "auto", "typedef", "sizeof", "if", "else", "for",
    "while", "do", "switch", "case", "default", "break", "continue", "return", "goto", "struct",
    "union", "enum", "NULL", "true", "false", "printf", "scanf", "fprintf", "fscanf", "sprintf",
    "sscanf", "malloc", "calloc", "realloc", "free", "strlen", "strcpy", "strcat", "strcmp",
    "memcpy", "memset", "fopen", "fclose", "fread", "fwrite", "fgets", "fputs", "main", "include",
    "define", "ifdef", "ifndef", "endif", "pragma", "INT_MIN", "INT_MAX", "LONG_MIN", "LONG_MAX",
];

const JAVA_KEYWORDS: &[&str] = &[
    "int", "float", "double", "char", "void", "boolean", "long", "short", "byte", "final",
    "static", "abstract", "synchronized", "volatile", "transient", "if", "else", "for", "while",
    "do", "switch", "case", "default", "break", "continue", "return", "throw", "try", "catch",
    "finally", "class", "interface", "enum", "extends", "implements", "package", "import",
    "public", "private", "protected", "new", "this", "super", "null", "true", "false",
    "instanceof", "assert", "native", "strictfp", "String", "Integer", "Long", "Double", "Float",
    "Boolean", "Character", "List", "ArrayList", "LinkedList", "Map", "HashMap", "TreeMap", "Set",
    "HashSet", "TreeSet", "Array", "Arrays", "Collections", "System", "out", "println", "print",
    "Math", "main", "args", "Override", "Deprecated", "SuppressWarnings",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else", "for", "while", "try", "except", "finally", "with",
    "as", "import", "from", "return", "yield", "raise", "pass", "break", "continue", "and", "or",
    "not", "in", "is", "lambda", "global", "nonlocal", "assert", "async", "await", "del", "True",
    "False", "None", "self", "cls", "__init__", "__main__", "__name__", "print", "input", "len",
    "range", "enumerate", "zip", "map", "filter", "str", "int", "float", "bool", "list", "dict",
    "set", "tuple", "type", "open", "file", "read", "write", "close", "sorted", "reversed",
    "sum", "max", "min", "abs", "round", "append", "extend", "insert", "remove", "pop", "clear",
    "keys", "values", "items", "get", "update",
];

const JAVASCRIPT_KEYWORDS: &[&str] = &[
    "var", "let", "const", "function", "return", "if", "else", "for", "while", "do", "switch",
    "case", "default", "break", "continue", "throw", "try", "catch", "finally", "class",
    "extends", "new", "this", "super", "typeof", "instanceof", "in", "of", "delete", "void",
    "null", "undefined", "true", "false", "async", "await", "yield", "import", "export",
    "console", "log", "length", "push", "pop", "shift", "unshift", "slice", "splice", "join",
    "split", "map", "filter", "reduce", "forEach", "indexOf", "includes", "Math", "JSON",
    "Object", "Array", "String", "Number", "Boolean", "parseInt", "parseFloat", "require",
    "module", "exports", "main",
];

const CPP_BOILERPLATE: &[&str] = &[
    "cin", "cout", "printf", "scanf", "getline", "puts", "gets", "endl", "flush", "begin", "end",
    "size", "length", "empty", "clear", "push_back", "pop_back", "front", "back", "insert",
    "erase", "find", "count", "new", "delete", "malloc", "free",
];

const C_BOILERPLATE: &[&str] = &[
    "printf", "scanf", "fprintf", "fscanf", "fgets", "fputs", "fopen", "fclose", "malloc",
    "calloc", "free", "memset",
];

const JAVA_BOILERPLATE: &[&str] = &[
    "println", "print", "printf", "nextInt", "nextLine", "next", "hasNext", "close", "toString",
    "equals", "hashCode", "size", "length", "isEmpty", "clear", "add", "remove", "get",
];

const PYTHON_BOILERPLATE: &[&str] = &[
    "print", "input", "open", "read", "write", "close", "len", "range", "enumerate", "zip",
    "str", "int", "float", "list", "dict", "set", "append", "extend", "pop", "remove",
];

const JAVASCRIPT_BOILERPLATE: &[&str] = &[
    "log", "warn", "error", "push", "pop", "shift", "unshift", "join", "split", "length",
    "indexOf", "require",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn cpp() -> &'static LanguageSpec {
        LanguageSpec::for_language(Language::Cpp)
    }

    #[test]
    fn classifies_cpp_lines() {
        assert_eq!(cpp().classify("for (int i = 0; i < n; i++) {"), LineKind::Loop);
        assert_eq!(cpp().classify("while (x > 0) {"), LineKind::Loop);
        assert_eq!(cpp().classify("if (a == b) {"), LineKind::Condition);
        assert_eq!(cpp().classify("return total;"), LineKind::Return);
        assert_eq!(cpp().classify("total += x;"), LineKind::Assignment);
        assert_eq!(cpp().classify("helper(a, b);"), LineKind::Call);
        assert_eq!(cpp().classify("}"), LineKind::Skip);
    }

    #[test]
    fn equality_is_not_assignment() {
        // `==`, `<=`, `>=` and `!=` must not read as assignments
        assert!(cpp().defined_variables("a == b").is_empty());
        assert!(cpp().defined_variables("a <= b").is_empty());
        assert!(cpp().defined_variables("a != b").is_empty());
        assert_eq!(
            cpp().defined_variables("total = a + b;"),
            BTreeSet::from(["total".to_string()])
        );
    }

    #[test]
    fn all_caps_constants_are_not_variables() {
        let defined = cpp().defined_variables("MOD = 7; x = MOD;");
        assert!(defined.contains("x"));
        assert!(!defined.contains("MOD"));
    }

    #[test]
    fn used_variables_exclude_definitions_and_types() {
        let defined = cpp().defined_variables("int total = value + offset;");
        let used = cpp().used_variables("int total = value + offset;", &defined);
        assert!(used.contains("value"));
        assert!(used.contains("offset"));
        assert!(!used.contains("total"));
        assert!(!used.contains("int"));
    }

    #[test]
    fn call_targets_filter_boilerplate() {
        let calls = cpp().call_targets("int answer = solve(n);");
        assert_eq!(calls, vec!["solve".to_string()]);

        // The outermost call wins the match; printf is boilerplate anyway
        let calls = cpp().call_targets("printf(\"%d\", n);");
        assert!(calls.is_empty());
    }

    #[test]
    fn python_loops_and_defs() {
        let py = LanguageSpec::for_language(Language::Python);
        assert_eq!(py.classify("for item in values:"), LineKind::Loop);
        assert_eq!(py.classify("elif x > 0:"), LineKind::Condition);
        assert!(py.is_function_def("def solve(n):"));
        let defs = py.defined_functions("def solve(n):\n    return helper(n)\ndef helper(n):\n    return n");
        assert!(defs.contains("solve"));
        assert!(defs.contains("helper"));
    }

    #[test]
    fn skeleton_labels_follow_construct_kind() {
        assert_eq!(cpp().skeleton_label("for (int i = 0; i < n; i++) {"), Some("for_statement"));
        assert_eq!(cpp().skeleton_label("if (x) {"), Some("if_statement"));
        assert_eq!(cpp().skeleton_label("return 0;"), Some("return_statement"));
        assert_eq!(cpp().skeleton_label("x = 3;"), None);
    }
}
