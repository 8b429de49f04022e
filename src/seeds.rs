//! Built-in content: PEP 8 guideline sections, the default question bank and the shop.
//! Guarantees the app is useful without any external config.

use crate::domain::{GuidelineSection, ItemKind, PowerUpEffect, Question, ShopItem};

fn q(id: &str, topic: &str, prompt: &str, choices: &[&str], correct: usize, feedback: &str, points: u32) -> Question {
  Question {
    id: id.into(),
    prompt: prompt.into(),
    code: None,
    choices: choices.iter().map(|c| c.to_string()).collect(),
    correct,
    feedback: feedback.into(),
    topic: topic.into(),
    points,
  }
}

fn with_code(mut q: Question, code: &str) -> Question {
  q.code = Some(code.into());
  q
}

pub fn seed_questions() -> Vec<Question> {
  vec![
    q("indent", "Indentation", "How many spaces should be used per indentation level?",
      &["2", "4", "8", "A tab character"], 1,
      "PEP 8 asks for 4 spaces per indentation level; never mix tabs and spaces.", 10),
    q("line_length", "Formatting", "What is the maximum recommended length for a line of code?",
      &["72 characters", "79 characters", "100 characters", "120 characters"], 1,
      "Code lines are limited to 79 characters (docstrings and comments to 72).", 10),
    q("function_names", "Naming", "Which name follows the convention for functions?",
      &["calculateTotal", "CalculateTotal", "calculate_total", "CALCULATE_TOTAL"], 2,
      "Functions and variables use lowercase words separated by underscores (snake_case).", 10),
    q("class_names", "Naming", "Which name follows the convention for classes?",
      &["user_account", "UserAccount", "userAccount", "USER_ACCOUNT"], 1,
      "Classes use CapWords (also called CamelCase).", 10),
    q("constants", "Naming", "How should module-level constants be named?",
      &["max_size", "MaxSize", "MAX_SIZE", "maxSize"], 2,
      "Constants are written in all capital letters with underscores between words.", 10),
    with_code(
      q("operator_spacing", "Formatting", "Which version follows the whitespace rules around operators?",
        &["Version 1", "Version 2", "Both are equally fine", "Neither"], 1,
        "Surround binary operators with a single space on each side.", 10),
      "# Version 1\nx=1+2*3\n\n# Version 2\nx = 1 + 2 * 3",
    ),
    with_code(
      q("comma_spacing", "Formatting", "Which list literal is formatted correctly?",
        &["Version 1", "Version 2", "Both are equally fine", "Neither"], 1,
        "Put one space after each comma in lists, tuples and argument lists.", 10),
      "# Version 1\nnums = [1,2,3,4]\n\n# Version 2\nnums = [1, 2, 3, 4]",
    ),
    with_code(
      q("inline_comments", "Comments", "Which inline comment is formatted correctly?",
        &["Version 1", "Version 2", "Both are equally fine", "Neither"], 1,
        "Inline comments are separated from code by at least two spaces and start with '# '.", 15),
      "# Version 1\nx = x + 1 #increment x\n\n# Version 2\nx = x + 1  # increment x",
    ),
    q("imports", "Imports", "Where do import statements belong?",
      &["Wherever they are first needed", "At the bottom of the file", "At the top of the file, after module docstrings", "Inside the main function"], 2,
      "Imports go at the top of the file, grouped: standard library, third party, then local.", 15),
    q("blank_lines", "Blank lines", "How many blank lines surround top-level function and class definitions?",
      &["One", "Two", "Three", "None"], 1,
      "Top-level definitions are surrounded by two blank lines; methods inside a class by one.", 15),
    q("none_compare", "Comparisons", "What is the recommended way to compare a value to None?",
      &["if x == None:", "if x is None:", "if not x:", "if x.equals(None):"], 1,
      "Comparisons to singletons like None should always use `is` or `is not`.", 20),
  ]
}

pub fn seed_shop() -> Vec<ShopItem> {
  vec![
    ShopItem {
      id: "double_points".into(),
      name: "Double Points (3 answers)".into(),
      cost: 20,
      kind: ItemKind::PowerUp { effect: PowerUpEffect::ScoreMultiplier { factor: 2 }, uses: 3 },
    },
    ShopItem {
      id: "fifty_fifty".into(),
      name: "50/50".into(),
      cost: 15,
      kind: ItemKind::PowerUp { effect: PowerUpEffect::FiftyFifty, uses: 1 },
    },
    ShopItem {
      id: "hint".into(),
      name: "Hint (shows the topic)".into(),
      cost: 8,
      kind: ItemKind::PowerUp { effect: PowerUpEffect::Hint, uses: 1 },
    },
    ShopItem {
      id: "skip".into(),
      name: "Skip question".into(),
      cost: 12,
      kind: ItemKind::PowerUp { effect: PowerUpEffect::Skip, uses: 1 },
    },
    ShopItem { id: "snake_badge".into(), name: "Snake Badge".into(), cost: 10, kind: ItemKind::Cosmetic },
    ShopItem { id: "golden_theme".into(), name: "Golden Theme".into(), cost: 50, kind: ItemKind::Cosmetic },
    ShopItem { id: "pep8_crown".into(), name: "PEP 8 Crown".into(), cost: 100, kind: ItemKind::Cosmetic },
  ]
}

fn section(title: &str, summary: &str, rules: &[&str], good: &str, bad: &str) -> GuidelineSection {
  GuidelineSection {
    title: title.into(),
    summary: summary.into(),
    rules: rules.iter().map(|r| r.to_string()).collect(),
    good_example: good.into(),
    bad_example: bad.into(),
  }
}

pub fn seed_guidelines() -> Vec<GuidelineSection> {
  vec![
    section(
      "Indentation",
      "Use 4 spaces per indentation level.",
      &["Never mix tabs and spaces.", "Align continuation lines with the opening delimiter or use a hanging indent."],
      "def long_function_name(\n        var_one, var_two,\n        var_three):\n    print(var_one)",
      "def long_function_name(\n    var_one, var_two,\n    var_three):\n    print(var_one)",
    ),
    section(
      "Maximum line length",
      "Limit all lines to a maximum of 79 characters.",
      &["Docstrings and comments are limited to 72 characters.", "Prefer implied line continuation inside parentheses over backslashes."],
      "total = (first_value\n         + second_value\n         - third_value)",
      "total = first_value + second_value - third_value + fourth_value + fifth_value + sixth_value",
    ),
    section(
      "Blank lines",
      "Separate top-level definitions with two blank lines and methods with one.",
      &["Use blank lines in functions, sparingly, to indicate logical sections."],
      "import os\n\n\ndef main():\n    pass\n\n\nclass Config:\n    pass",
      "import os\ndef main():\n    pass\nclass Config:\n    pass",
    ),
    section(
      "Imports",
      "Imports go on separate lines at the top of the file.",
      &[
        "Group: standard library, related third party, local application.",
        "Put a blank line between each group.",
        "Avoid wildcard imports.",
      ],
      "import os\nimport sys\n\nimport requests\n\nfrom myapp import models",
      "import sys, os\nfrom requests import *",
    ),
    section(
      "Whitespace in expressions",
      "Avoid extraneous whitespace.",
      &[
        "No spaces immediately inside brackets or before a comma.",
        "Surround binary operators with a single space on each side.",
        "No spaces around `=` for keyword arguments.",
      ],
      "spam(ham[1], {eggs: 2})\nx = x * 2 - 1\ncomplex(real, imag=0.0)",
      "spam( ham[ 1 ], { eggs: 2 } )\nx=x*2-1\ncomplex(real, imag = 0.0)",
    ),
    section(
      "Naming conventions",
      "Names should reflect usage, not implementation.",
      &[
        "Functions and variables: lowercase_with_underscores.",
        "Classes: CapWords.",
        "Constants: UPPER_CASE_WITH_UNDERSCORES.",
        "Never use `l`, `O` or `I` as single-character names.",
      ],
      "MAX_RETRIES = 3\n\n\nclass UserAccount:\n    def get_balance(self):\n        pass",
      "maxRetries = 3\n\n\nclass user_account:\n    def GetBalance(self):\n        pass",
    ),
    section(
      "Comments and docstrings",
      "Comments that contradict the code are worse than no comments.",
      &[
        "Write docstrings for all public modules, functions, classes and methods.",
        "Use inline comments sparingly, separated by at least two spaces.",
      ],
      "def area(radius):\n    \"\"\"Return the area of a circle.\"\"\"\n    return math.pi * radius ** 2",
      "def area(radius):\n    return math.pi * radius ** 2 # area",
    ),
  ]
}
