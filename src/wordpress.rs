//! Blog operations on top of [`ServerProxy`].
//!
//! Every operation is a fixed sequence of remote calls. Faults are never
//! swallowed: the first one ends the sequence and is returned as
//! [`Error::Fault`].

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::media::MediaObject;
use crate::methods;
use crate::records::{self, Blog, Category, Post, TrackbackPing, User};
use crate::xmlrpc::client::{Endpoint, HttpTransport, Transport};
use crate::xmlrpc::encoding::{DecodeError, Struct, Value};
use crate::xmlrpc::progress::Progress;
use crate::xmlrpc::proxy::ServerProxy;

/// Posts fetched by [`WordPressClient::get_recent_posts`] when callers have
/// no better number.
pub const DEFAULT_RECENT_POSTS: usize = 5;

pub struct WordPressClient<T: Transport = HttpTransport> {
    user: String,
    password: String,
    blog_id: i32,
    categories: Option<Vec<Category>>,
    server: ServerProxy<T>,
}

impl WordPressClient<HttpTransport> {
    pub fn new(url: &str, user: &str, password: &str) -> Result<WordPressClient<HttpTransport>> {
        WordPressClient::with_config(url, user, password, Config::default())
    }

    pub fn with_config(
        url: &str,
        user: &str,
        password: &str,
        config: Config,
    ) -> Result<WordPressClient<HttpTransport>> {
        let server = ServerProxy::new(url, config)?;
        Ok(WordPressClient::from_proxy(server, user, password))
    }
}

impl<T: Transport> WordPressClient<T> {
    /// Uses `transport` instead of HTTP. The URL is still validated.
    pub fn with_transport(
        url: &str,
        user: &str,
        password: &str,
        transport: T,
        config: Config,
    ) -> Result<WordPressClient<T>> {
        let endpoint = Endpoint::parse(url)?;
        let server = ServerProxy::with_transport(endpoint, transport, config.encoding);
        Ok(WordPressClient::from_proxy(server, user, password))
    }

    fn from_proxy(server: ServerProxy<T>, user: &str, password: &str) -> WordPressClient<T> {
        WordPressClient {
            user: user.to_string(),
            password: password.to_string(),
            blog_id: 0,
            categories: None,
            server,
        }
    }

    /// Sets the blog used by multi-blog calls. Does not contact the server.
    pub fn select_blog(&mut self, blog_id: i32) {
        if blog_id != self.blog_id {
            // Categories belong to a blog.
            self.categories = None;
        }
        self.blog_id = blog_id;
    }

    pub fn blog_id(&self) -> i32 {
        self.blog_id
    }

    pub fn server(&self) -> &ServerProxy<T> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut ServerProxy<T> {
        &mut self.server
    }

    pub fn close(&mut self) {
        self.server.close();
    }

    pub fn supported_methods(&mut self) -> Result<Vec<String>> {
        let value = self.server.invoke(methods::SUPPORTED_METHODS, params![])?;
        string_list(&value, methods::SUPPORTED_METHODS)
    }

    pub fn get_last_post(&mut self) -> Result<Option<Post>> {
        Ok(self.get_recent_posts(1)?.into_iter().next())
    }

    pub fn get_recent_posts(&mut self, count: usize) -> Result<Vec<Post>> {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        let params = params![self.blog_id, &self.user, &self.password, count];
        let value = self.server.invoke(methods::GET_RECENT_POSTS, params)?;
        records::list_of(&value, "posts", Post::from_value)
    }

    pub fn get_post(&mut self, post_id: i32) -> Result<Post> {
        let params = params![post_id.to_string(), &self.user, &self.password];
        let value = self.server.invoke(methods::GET_POST, params)?;
        Post::from_value(&value)
    }

    pub fn get_user_info(&mut self) -> Result<User> {
        let params = params!["", &self.user, &self.password];
        let value = self.server.invoke(methods::GET_USER_INFO, params)?;
        User::from_value(&value)
    }

    pub fn get_users_blogs(&mut self) -> Result<Vec<Blog>> {
        let params = params!["", &self.user, &self.password];
        let value = self.server.invoke(methods::GET_USERS_BLOGS, params)?;
        records::list_of(&value, "blogs", Blog::from_value)
    }

    /// Creates `post` as a draft, assigns its categories, then publishes it
    /// if asked. Returns the new post id.
    pub fn new_post(&mut self, post: &Post, publish: bool) -> Result<i32> {
        let categories = self.resolve_categories(&post.categories)?;

        let mut content = Struct::new();
        content.insert("title".to_string(), Value::from(&post.title));
        content.insert("description".to_string(), Value::from(&post.description));
        content.insert("mt_keywords".to_string(), Value::from(&post.tags));
        content.insert("custom_fields".to_string(), custom_fields(post));

        let value = self.server.invoke(
            methods::NEW_POST,
            params![self.blog_id, &self.user, &self.password, content, false],
        )?;
        let post_id = records::id_value(&value, "post id")?;
        debug!("Created post {}", post_id);

        self.set_post_categories(post_id, &categories)?;
        if publish {
            self.publish_post(post_id)?;
        }
        Ok(post_id)
    }

    /// Replaces the stored post, its categories, and publishes it if asked.
    pub fn edit_post(&mut self, post_id: i32, post: &Post, publish: bool) -> Result<()> {
        let categories = self.resolve_categories(&post.categories)?;

        let mut content = Struct::new();
        content.insert("title".to_string(), Value::from(&post.title));
        content.insert("description".to_string(), Value::from(&post.description));
        content.insert("permaLink".to_string(), Value::from(&post.perma_link));
        content.insert("mt_allow_pings".to_string(), Value::from(post.allow_pings));
        content.insert("mt_text_more".to_string(), Value::from(&post.text_more));
        content.insert("mt_excerpt".to_string(), Value::from(&post.excerpt));
        if let Some(date) = post.date {
            content.insert("dateCreated".to_string(), Value::from(date));
        }

        let params = params![post_id, &self.user, &self.password, content, false];
        let value = self.server.invoke(methods::EDIT_POST, params)?;
        if records::wire_flag(&value) != Some(true) {
            return Err(Error::local("Post edit failed"));
        }

        self.set_post_categories(post_id, &categories)?;
        if publish {
            self.publish_post(post_id)?;
        }
        Ok(())
    }

    pub fn delete_post(&mut self, post_id: i32) -> Result<bool> {
        let params = params!["", post_id, &self.user, &self.password];
        let value = self.server.invoke(methods::DELETE_POST, params)?;
        Ok(acknowledged(&value, methods::DELETE_POST))
    }

    pub fn get_post_categories(&mut self, post_id: i32) -> Result<Vec<Category>> {
        let params = params![post_id, &self.user, &self.password];
        let value = self.server.invoke(methods::GET_POST_CATEGORIES, params)?;
        records::list_of(&value, "categories", Category::from_value)
    }

    pub fn set_post_categories(&mut self, post_id: i32, categories: &[Category]) -> Result<bool> {
        let categories: Vec<Value> = categories.iter().map(Category::to_value).collect();
        let value = self.server.invoke(
            methods::SET_POST_CATEGORIES,
            params![post_id, &self.user, &self.password, categories],
        )?;
        Ok(acknowledged(&value, methods::SET_POST_CATEGORIES))
    }

    /// Categories of the selected blog. Fetched once, then served from memory.
    pub fn get_category_list(&mut self) -> Result<&[Category]> {
        let categories = match self.categories.take() {
            Some(categories) => categories,
            None => {
                let params = params![self.blog_id, &self.user, &self.password];
                let value = self.server.invoke(methods::GET_CATEGORY_LIST, params)?;
                let categories = records::list_of(&value, "categories", Category::from_value)?;
                debug!("Cached {} categories for blog {}", categories.len(), self.blog_id);
                categories
            }
        };
        Ok(self.categories.insert(categories))
    }

    pub fn get_category_id_from_name(&mut self, name: &str) -> Result<Option<i32>> {
        let categories = self.get_category_list()?;
        Ok(categories.iter().find(|c| c.name == name).map(|c| c.id))
    }

    pub fn get_trackback_pings(&mut self, post_id: i32) -> Result<Vec<TrackbackPing>> {
        let value = self.server.invoke(methods::GET_TRACKBACK_PINGS, params![post_id])?;
        records::list_of(&value, "trackback pings", TrackbackPing::from_value)
    }

    pub fn publish_post(&mut self, post_id: i32) -> Result<bool> {
        let params = params![post_id, &self.user, &self.password];
        let value = self.server.invoke(methods::PUBLISH_POST, params)?;
        Ok(acknowledged(&value, methods::PUBLISH_POST))
    }

    /// URLs of the pages linking to the post at `url`.
    pub fn get_pingbacks(&mut self, url: &str) -> Result<Vec<String>> {
        let value = self.server.invoke(methods::GET_PINGBACKS, params![url])?;
        string_list(&value, methods::GET_PINGBACKS)
    }

    /// Uploads the file at `path`, printing progress to standard output.
    /// Returns the URL the server stored it under.
    pub fn new_media_object(&mut self, path: &Path) -> Result<String> {
        let media = MediaObject::from_path(path)?;
        let progress = Progress::new(media.name.clone());
        self.upload(media, progress.into_callback())
    }

    pub fn new_media_object_with_progress<F>(&mut self, path: &Path, callback: F) -> Result<String>
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        let media = MediaObject::from_path(path)?;
        self.upload(media, callback)
    }

    fn upload<F>(&mut self, media: MediaObject, callback: F) -> Result<String>
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        debug!("Upload {} ({}, {} bytes)", media.name, media.mime_type, media.bits.len());

        let value = self.server.invoke_with_progress(
            methods::NEW_MEDIA_OBJECT,
            params![self.blog_id, &self.user, &self.password, media.to_value()],
            callback,
        )?;
        match value.get("url").and_then(Value::as_str) {
            Some(url) => Ok(url.to_string()),
            None => Err(DecodeError::MissingMember("url".to_string()).into()),
        }
    }

    /// Looks up category ids by name; the first category becomes primary.
    fn resolve_categories(&mut self, names: &[String]) -> Result<Vec<Category>> {
        let mut categories = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let id = self
                .get_category_id_from_name(name)?
                .ok_or_else(|| Error::local(format!("Unknown category: {}", name)))?;
            categories.push(Category { id, name: name.clone(), is_primary: i == 0 });
        }
        Ok(categories)
    }
}

fn custom_fields(post: &Post) -> Value {
    Value::Array(post.custom_fields.iter().map(|field| field.to_value()).collect())
}

/// Only a true flag counts as success; any other well-formed reply is `false`.
fn acknowledged(value: &Value, method: &str) -> bool {
    let flag = records::wire_flag(value);
    if flag.is_none() {
        debug!("{} answered {} instead of a flag", method, value.kind());
    }
    flag == Some(true)
}

fn string_list(value: &Value, method: &str) -> Result<Vec<String>> {
    records::list_of(value, method, |item| match item.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(DecodeError::MemberType {
            member: method.to_string(),
            expected: "string",
            found: item.kind(),
        }
        .into()),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::WordPressClient;
    use crate::config::{Config, Encoding};
    use crate::error::{Error, Result};
    use crate::methods;
    use crate::records::Post;
    use crate::xmlrpc::client::{Endpoint, Payload, Transport};
    use crate::xmlrpc::encoding::{Struct, Value};
    use crate::xmlrpc::protocol::{Fault, MethodCall, Response};

    /// Plays back one response per call, in order.
    #[derive(Default)]
    struct Scripted {
        responses: VecDeque<Response>,
        calls: Vec<MethodCall>,
    }

    impl Transport for Scripted {
        fn send(&mut self, _endpoint: &Endpoint, payload: Payload) -> Result<Vec<u8>> {
            let body = payload.into_bytes()?;
            self.calls.push(MethodCall::decode(&body)?);
            let response = self.responses.pop_front().expect("unscripted call");
            Ok(response.encode(Encoding::Utf8))
        }

        fn close(&mut self) {}
    }

    fn client(responses: Vec<Response>) -> WordPressClient<Scripted> {
        let transport = Scripted {
            responses: responses.into(),
            calls: Vec::new(),
        };
        WordPressClient::with_transport(
            "http://blog.example/xmlrpc.php",
            "admin",
            "secret",
            transport,
            Config::default(),
        )
        .unwrap()
    }

    fn ok<V: Into<Value>>(value: V) -> Response {
        Response::Success(vec![value.into()])
    }

    fn category(id: i32, name: &str) -> Value {
        let mut members = Struct::new();
        members.insert("categoryId".to_string(), Value::from(id.to_string()));
        members.insert("categoryName".to_string(), Value::from(name));
        Value::Struct(members)
    }

    fn called(client: &WordPressClient<Scripted>) -> Vec<String> {
        client.server().transport().calls.iter().map(|c| c.method.clone()).collect()
    }

    #[test]
    fn category_list_is_fetched_once() {
        let mut client = client(vec![ok(vec![category(1, "News"), category(2, "Misc")])]);

        assert_eq!(2, client.get_category_list().unwrap().len());
        assert_eq!(Some(2), client.get_category_id_from_name("Misc").unwrap());
        assert_eq!(None, client.get_category_id_from_name("Nope").unwrap());

        assert_eq!(vec![methods::GET_CATEGORY_LIST.to_string()], called(&client));
    }

    #[test]
    fn selecting_another_blog_drops_the_cache() {
        let mut client = client(vec![ok(vec![category(1, "News")]), ok(Vec::<Value>::new())]);

        client.get_category_list().unwrap();
        client.select_blog(3);

        assert!(client.get_category_list().unwrap().is_empty());
        assert_eq!(Value::from(3), client.server().transport().calls[1].params[0]);
    }

    #[test]
    fn unsupported_scheme_fails_before_any_transport() {
        let result = WordPressClient::new("ftp://blog.example/xmlrpc.php", "admin", "secret");

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn new_then_edit_publishes_once_after_edit() {
        let mut client = client(vec![ok("7"), ok(true), ok(true), ok(true), ok(true)]);
        let mut post = Post {
            title: "Hello".into(),
            description: "World".into(),
            ..Post::default()
        };
        post.add_custom_field("mood", "sunny");

        let post_id = client.new_post(&post, false).unwrap();
        client.edit_post(post_id, &post, true).unwrap();

        assert_eq!(7, post_id);
        let calls = called(&client);
        assert_eq!(
            vec![
                methods::NEW_POST,
                methods::SET_POST_CATEGORIES,
                methods::EDIT_POST,
                methods::SET_POST_CATEGORIES,
                methods::PUBLISH_POST,
            ],
            calls
        );
        assert_eq!(1, calls.iter().filter(|m| *m == methods::PUBLISH_POST).count());

        let new_post = &client.server().transport().calls[0];
        assert_eq!(Value::from(false), new_post.params[4]);
        let fields = new_post.params[3].find_path(&["custom_fields"]);
        let first = fields.and_then(Value::as_array).and_then(|f| f.first());
        assert_eq!(Some("sunny"), first.and_then(|f| f.get("value")).and_then(Value::as_str));
    }

    #[test]
    fn first_category_is_primary() {
        let categories = vec![category(1, "News"), category(2, "Misc")];
        let mut client = client(vec![ok(categories), ok(3), ok(true)]);
        let post = Post {
            categories: vec!["Misc".into(), "News".into()],
            ..Post::default()
        };

        client.new_post(&post, false).unwrap();

        let assigned = client.server().transport().calls[2].params[3].as_array().unwrap().clone();
        assert_eq!(Some(2), assigned[0].get("categoryId").and_then(Value::as_i32));
        assert_eq!(Some(true), assigned[0].get("isPrimary").and_then(Value::as_bool));
        assert_eq!(Some(false), assigned[1].get("isPrimary").and_then(Value::as_bool));
    }

    #[test]
    fn unknown_category_fails_before_posting() {
        let mut client = client(vec![ok(vec![category(1, "News")])]);
        let post = Post { categories: vec!["Gossip".into()], ..Post::default() };

        let err = client.new_post(&post, true).unwrap_err();

        assert!(err.fault().unwrap().is_local());
        assert_eq!(vec![methods::GET_CATEGORY_LIST.to_string()], called(&client));
    }

    #[test]
    fn rejected_edit_is_a_local_fault() {
        let mut client = client(vec![ok(0)]);

        let err = client.edit_post(7, &Post::default(), true).unwrap_err();

        let fault = err.fault().unwrap();
        assert_eq!(0, fault.code());
        assert_eq!("Post edit failed", fault.message());
        assert_eq!(vec![methods::EDIT_POST.to_string()], called(&client));
    }

    #[test]
    fn remote_faults_propagate() {
        let mut client = client(vec![Response::Fault(Fault::new(403, "Forbidden"))]);

        match client.get_post(1) {
            Err(Error::Fault(fault)) => assert_eq!(Fault::new(403, "Forbidden"), fault),
            other => panic!("expected a fault, got {:?}", other.map(|p| p.id)),
        }
    }

    #[test]
    fn simple_calls_send_expected_arguments() {
        let mut user = Struct::new();
        user.insert("userid".to_string(), Value::from("1"));
        user.insert("nickname".to_string(), Value::from("admin"));
        let pingbacks = vec!["http://other.example/"];
        let mut client = client(vec![ok(Value::Struct(user)), ok(true), ok(pingbacks)]);

        assert_eq!("admin", client.get_user_info().unwrap().nickname);
        assert!(client.delete_post(9).unwrap());
        let pingbacks = client.get_pingbacks("http://blog.example/?p=9").unwrap();
        assert_eq!(vec!["http://other.example/".to_string()], pingbacks);

        let calls = &client.server().transport().calls;
        assert_eq!(params!["", "admin", "secret"], calls[0].params);
        assert_eq!(params!["", 9, "admin", "secret"], calls[1].params);
        assert_eq!(params!["http://blog.example/?p=9"], calls[2].params);
    }

    #[test]
    fn list_results_are_projected() {
        let mut ping = Struct::new();
        ping.insert("pingTitle".to_string(), Value::from("Nice post"));
        ping.insert("pingURL".to_string(), Value::from("http://other.example/"));
        ping.insert("pingIP".to_string(), Value::from("192.0.2.1"));
        let mut blog = Struct::new();
        blog.insert("blogid".to_string(), Value::from("1"));
        blog.insert("blogName".to_string(), Value::from("Example"));
        blog.insert("isAdmin".to_string(), Value::from(true));
        let mut primary = Struct::new();
        primary.insert("categoryId".to_string(), Value::from("4"));
        primary.insert("categoryName".to_string(), Value::from("News"));
        primary.insert("isPrimary".to_string(), Value::from(1));
        let mut client = client(vec![
            ok(vec![Value::Struct(ping)]),
            ok(vec![Value::Struct(blog)]),
            ok(vec![Value::Struct(primary)]),
        ]);

        assert_eq!("192.0.2.1", client.get_trackback_pings(9).unwrap()[0].ip);
        assert!(client.get_users_blogs().unwrap()[0].is_admin);
        let categories = client.get_post_categories(9).unwrap();
        assert_eq!((4, true), (categories[0].id, categories[0].is_primary));

        assert_eq!(vec![Value::from(9)], client.server().transport().calls[0].params);
    }

    #[test]
    fn unexpected_acknowledgements_read_as_false() {
        let mut client = client(vec![ok(2), ok("done"), ok(Value::Nil), ok("1")]);

        assert!(!client.publish_post(7).unwrap());
        assert!(!client.delete_post(7).unwrap());
        assert!(!client.set_post_categories(7, &[]).unwrap());
        assert!(client.publish_post(7).unwrap());
    }

    #[test]
    fn last_post_of_empty_blog_is_none() {
        let mut client = client(vec![ok(Vec::<Value>::new())]);

        assert!(client.get_last_post().unwrap().is_none());
        assert_eq!(Value::from(1), client.server().transport().calls[0].params[3]);
    }

    #[test]
    fn media_upload_reports_progress_and_returns_url() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let mut stored = Struct::new();
        stored.insert("url".to_string(), Value::from("http://blog.example/photo.png"));
        let mut client = client(vec![ok(Value::Struct(stored))]);

        let seen = Arc::new(Mutex::new(0u64));
        let counter = Arc::clone(&seen);
        let url = client
            .new_media_object_with_progress(file.path(), move |_, size| {
                *counter.lock().unwrap() += size
            })
            .unwrap();

        assert_eq!("http://blog.example/photo.png", url);
        assert!(*seen.lock().unwrap() > 0);
        let media = &client.server().transport().calls[0].params[3];
        assert_eq!(Some("image/png"), media.get("type").and_then(Value::as_str));
        let bits = media.get("bits").and_then(Value::as_bytes);
        assert_eq!(Some(&[0x89, b'P', b'N', b'G'][..]), bits);
    }
}
