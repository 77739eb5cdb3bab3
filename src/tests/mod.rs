
mod gestures;
mod scroll;
