use crate::shortcut::Action;

/// Which side of a `changes.label_ids` delta to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCheck {
    Adds,
    Removes,
}

/// True when `label_id` is in any action's direct label set or in the
/// selected side of its label delta.
pub fn label_present(actions: &[Action], label_id: i64, check: LabelCheck) -> bool {
    actions.iter().any(|action| {
        let direct = action
            .label_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(&label_id));

        let delta = action
            .changes
            .as_ref()
            .and_then(|c| c.label_ids.as_ref())
            .is_some_and(|delta| match check {
                LabelCheck::Adds => delta.adds.contains(&label_id),
                LabelCheck::Removes => delta.removes.contains(&label_id),
            });

        direct || delta
    })
}
