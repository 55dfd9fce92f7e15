mod build;
mod interaction;
mod view;

pub(super) use self::interaction::InteractionController;
