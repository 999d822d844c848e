//! Names of the remote methods this crate calls.

macro_rules! method_table {
    ($($(#[$doc:meta])* $name:ident => $wire:expr),+ $(,)?) => {
        $($(#[$doc])* pub const $name: &str = $wire;)+

        /// Every method in the table, in declaration order.
        pub const ALL: &[&str] = &[$($name),+];
    };
}

method_table! {
    SUPPORTED_METHODS => "mt.supportedMethods",
    GET_RECENT_POSTS => "metaWeblog.getRecentPosts",
    GET_POST => "metaWeblog.getPost",
    NEW_POST => "metaWeblog.newPost",
    EDIT_POST => "metaWeblog.editPost",
    NEW_MEDIA_OBJECT => "metaWeblog.newMediaObject",
    GET_USER_INFO => "blogger.getUserInfo",
    GET_USERS_BLOGS => "blogger.getUsersBlogs",
    DELETE_POST => "blogger.deletePost",
    GET_CATEGORY_LIST => "mt.getCategoryList",
    GET_POST_CATEGORIES => "mt.getPostCategories",
    SET_POST_CATEGORIES => "mt.setPostCategories",
    GET_TRACKBACK_PINGS => "mt.getTrackbackPings",
    PUBLISH_POST => "mt.publishPost",
    /// Pingback extension; takes a post URL rather than an id.
    GET_PINGBACKS => "pingback.extensions.getPingbacks",
}
