mod codec_props;
mod inspection;
mod lifecycle;
mod session;
