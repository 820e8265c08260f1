//! Human-readable labels for generation offsets.

/// Label for an ancestor `generation` steps up (1 = parent).
pub fn ancestor_label(generation: u32) -> String {
  match generation {
    0 => "self".into(),
    1 => "parent".into(),
    2 => "grandparent".into(),
    3 => "great-grandparent".into(),
    n => format!("{}×great-grandparent", n - 2),
  }
}

/// Label for a descendant `generation` steps down (1 = child).
pub fn descendant_label(generation: u32) -> String {
  match generation {
    0 => "self".into(),
    1 => "child".into(),
    2 => "grandchild".into(),
    3 => "great-grandchild".into(),
    n => format!("{}×great-grandchild", n - 2),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_cover_deep_generations() {
    assert_eq!(ancestor_label(1), "parent");
    assert_eq!(ancestor_label(2), "grandparent");
    assert_eq!(ancestor_label(3), "great-grandparent");
    assert_eq!(ancestor_label(5), "3×great-grandparent");
    assert_eq!(descendant_label(1), "child");
    assert_eq!(descendant_label(4), "2×great-grandchild");
  }
}
